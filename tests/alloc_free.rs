//! Allocation-free render path tests.
//!
//! These tests verify that `Engine::render_block()` does not allocate
//! while voices start, steal, ramp and finish, and while effects and the
//! output tap are swapped in. Control-side work (scheduling, chain
//! construction) happens outside the checked region, as it does live.
//!
//! Runs under plain `cargo test`; no feature flags needed.

use std::sync::Arc;

use assert_no_alloc::{assert_no_alloc, AllocDisabler};

#[cfg(debug_assertions)]
#[global_allocator]
static A: AllocDisabler = AllocDisabler;

use pl_engine::{
    create_chain, CommandSink, Engine, EngineCommand, EngineSettings, ParamSync, Ramp, RenderSettings,
    SchedulerSettings, Sequencer, VoiceRenderer,
};
use pl_ir::{
    BankId, EffectSpec, LockParam, Part, PartConfig, PatternId, Project, SampleBuffer, SlotId, BLOCK_SIZE,
    SYNTH_BANK,
};

const RATE: u32 = 44100;

fn busy_project() -> Project {
    let mut project = Project::new();
    project.tempo = 174.0;
    let buffer = Arc::new(SampleBuffer::mono((0..4410).map(|i| ((i % 100) as f32 / 50.0) - 1.0).collect(), RATE));
    for bank in [BankId::new(0), BankId::new(1), BankId::new(2)] {
        for slot in bank.slots() {
            project.slots.get_mut(slot).buffer = Some(buffer.clone());
        }
        let pattern = project.patterns_mut().get_mut(bank.first_pattern());
        *pattern.part_mut(Part::A) = PartConfig::new(32, 16, 2);
        *pattern.part_mut(Part::B) = PartConfig::new(12, 5, 3);
        for lane in 0..8 {
            pattern.fill_part(lane, Part::A);
            pattern.fill_part(lane, Part::B);
            pattern.lane_mut(lane).set_lock(LockParam::Pitch, 3, Some(7.0));
            pattern.lane_mut(lane).set_lock(LockParam::Volume, 5, Some(0.4));
            pattern.lane_mut(lane).set_lock(LockParam::Lowpass, 6, Some(800.0));
        }
    }
    let synth = project.patterns_mut().get_mut(SYNTH_BANK.first_pattern());
    for step in 0..16 {
        synth.record_step(step % 8, step, 48 + step as u8, 100);
    }
    project.bank_mut(BankId::new(1)).groove = pl_ir::GrooveId(8);
    project.master.compressor.enabled = true;
    project.master.effects = vec![
        EffectSpec::Tone { cutoff_hz: 6000.0 },
        EffectSpec::Delay { time_ms: 250.0, feedback: 0.5, mix: 0.3 },
        EffectSpec::Bitcrush { bits: 10, downsample: 2 },
    ];
    project
}

/// Drive the engine for `seconds`, scheduling between blocks and rendering
/// each block with allocation checks on.
fn assert_render_alloc_free(project: &Project, seconds: f64, mut between: impl FnMut(usize, &mut Vec<EngineCommand>)) {
    let (mut engine, handle) = Engine::new(EngineSettings::new(RATE));
    let mut commands = handle.commands.clone();
    ParamSync::new(441, RATE).sync(project, 0, &mut commands);
    let renderer = VoiceRenderer::new(RATE, RenderSettings::default());
    let mut seq = Sequencer::new(handle.clock.clone(), renderer, SchedulerSettings::default());
    seq.set_playing(true, project, &mut commands);

    let mut out = vec![0.0f32; BLOCK_SIZE * 2];
    let mut extra = Vec::new();
    let blocks = (seconds * RATE as f64) as usize / BLOCK_SIZE;
    for block in 0..blocks {
        seq.tick(project, &mut commands);
        between(block, &mut extra);
        for command in extra.drain(..) {
            CommandSink::send(&mut commands, command);
        }
        assert_no_alloc(|| engine.process(&mut out, 2));
        handle.collect_garbage();
    }
    assert!(handle.stats.blocks() > 0);
}

#[test]
fn dense_patterns_alloc_free() {
    assert_render_alloc_free(&busy_project(), 5.0, |_, _| {});
}

#[test]
fn voice_stealing_alloc_free() {
    let mut project = busy_project();
    project.tempo = 300.0;
    for slot in SlotId::all() {
        project.slots.get_mut(slot).params.looping = true;
    }
    assert_render_alloc_free(&project, 3.0, |_, _| {});
}

#[test]
fn live_mixer_changes_alloc_free() {
    let project = busy_project();
    assert_render_alloc_free(&project, 3.0, |block, extra| {
        let at = (block * BLOCK_SIZE) as u64;
        match block % 40 {
            0 => extra.push(EngineCommand::SlotPitch(SlotId::new(block % 24), Ramp::new(300.0, at, 2000))),
            10 => extra.push(EngineCommand::BankPan(BankId::new(block % 4), Ramp::new(-0.5, at, 441))),
            20 => extra.push(EngineCommand::BankSolo(BankId::new(2), block % 80 == 20)),
            30 => extra.push(EngineCommand::Effects(create_chain(
                &[EffectSpec::Delay { time_ms: 80.0, feedback: 0.2, mix: 0.5 }],
                RATE,
            ))),
            _ => {}
        }
    });
}

#[test]
fn output_tap_alloc_free() {
    use ringbuf::traits::Split;
    use ringbuf::HeapRb;

    let project = busy_project();
    let mut consumers = Vec::new();
    assert_render_alloc_free(&project, 2.0, |block, extra| {
        if block % 50 == 0 {
            let (producer, consumer) = HeapRb::<f32>::new(RATE as usize).split();
            consumers.push(consumer);
            extra.push(EngineCommand::Tap(Some(producer)));
        } else if block % 50 == 25 {
            extra.push(EngineCommand::Tap(None));
        }
    });
    assert!(!consumers.is_empty());
}

#[test]
fn pattern_switch_alloc_free() {
    let mut project = busy_project();
    let second = PatternId::new(1);
    project.patterns_mut().get_mut(second).fill_part(0, Part::A);
    project.select_pattern(BankId::new(0), second);
    assert_render_alloc_free(&project, 2.0, |_, _| {});
}
