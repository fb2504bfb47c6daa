//! Faster-than-real-time rendering of a project.
//!
//! Drives the same sequencer and engine as live playback, but ticks the
//! scheduler from the render loop on the engine's frame clock, so the
//! output is deterministic.

use pl_engine::{seconds_to_frames, Engine, ParamSync, Sequencer, VoiceRenderer};
use pl_ir::{Project, SampleBuffer, BLOCK_SIZE};
use tracing::info;

use crate::config::Config;

/// Render `seconds` of `project` with the transport started at frame 0.
pub fn render_offline(project: &Project, seconds: f64, config: &Config) -> SampleBuffer {
    let (mut engine, handle) = Engine::new(config.engine_settings(config.sample_rate));
    let rate = engine.sample_rate();
    let mut commands = handle.commands.clone();

    let mut sync = ParamSync::new(config.param_ramp_frames(rate), rate);
    sync.sync(project, 0, &mut commands);

    let mut settings = config.scheduler_settings();
    settings.start_delay = 0.0;
    let renderer = VoiceRenderer::new(rate, config.render_settings());
    let mut sequencer = Sequencer::new(handle.clock.clone(), renderer, settings);
    sequencer.set_playing(true, project, &mut commands);

    let total = seconds_to_frames(seconds, rate) as usize;
    // Tick at least twice per lookahead window so no step is missed.
    let interval = (config.timer_interval_ms as f64 / 1000.0).min(settings.lookahead / 2.0);
    let tick_frames = (seconds_to_frames(interval, rate) as usize).max(1);

    let mut left = Vec::with_capacity(total);
    let mut right = Vec::with_capacity(total);
    while left.len() < total {
        sequencer.tick(project, &mut commands);
        let until = (left.len() + tick_frames).min(total);
        while left.len() < until {
            let frames = (until - left.len()).min(BLOCK_SIZE);
            let block = engine.render_block(frames);
            left.extend_from_slice(&block.channel(0)[..frames]);
            right.extend_from_slice(&block.channel(1)[..frames]);
        }
        handle.collect_garbage();
    }

    info!(seconds, sample_rate = rate, "offline render finished");
    SampleBuffer::stereo(left, right, rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pl_ir::{BankId, Part, PartConfig, PatternId, SlotId};
    use std::sync::Arc;

    fn one_shot_project() -> Project {
        let mut project = Project::new();
        let slot = project.slots.get_mut(SlotId::new(0));
        slot.buffer = Some(Arc::new(SampleBuffer::mono(vec![0.5; 480], 48000)));
        let pattern = project.patterns_mut().get_mut(PatternId::new(0));
        *pattern.part_mut(Part::A) = PartConfig::new(4, 4, 1);
        *pattern.part_mut(Part::B) = PartConfig::new(4, 4, 1);
        pattern.toggle_step(0, 0);
        project
    }

    fn onset_frames(buffer: &SampleBuffer) -> Vec<usize> {
        let left = buffer.left();
        (0..left.len())
            .filter(|&i| left[i] != 0.0 && (i == 0 || left[i - 1] == 0.0))
            .collect()
    }

    #[test]
    fn renders_requested_length() {
        let out = render_offline(&Project::new(), 0.5, &Config::default());
        assert_eq!(out.frames(), 24000);
        assert_eq!(out.sample_rate(), 48000);
        assert_eq!(out.peak(), 0.0);
    }

    #[test]
    fn step_lands_on_exact_frame() {
        // Quarter notes at 120 BPM: the pattern repeats every 8 steps, 4 s.
        // The attack ramp starts from zero, so sound begins one frame in.
        let out = render_offline(&one_shot_project(), 4.5, &Config::default());
        assert_eq!(onset_frames(&out), vec![1, 192001]);
    }

    #[test]
    fn render_is_deterministic() {
        let project = one_shot_project();
        let a = render_offline(&project, 1.0, &Config::default());
        let b = render_offline(&project, 1.0, &Config::default());
        assert_eq!(a, b);
    }

    #[test]
    fn muted_bank_renders_silence() {
        let mut project = one_shot_project();
        project.bank_mut(BankId::new(0)).mute = true;
        let out = render_offline(&project, 0.5, &Config::default());
        assert_eq!(out.peak(), 0.0);
    }
}
