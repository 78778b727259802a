//! loopcore CLI — scripted looper demo and clip tools.
//!
//! Usage:
//!   cargo run                          (record + playback demo)
//!   cargo run -- --save clip.loop      (demo, then save track 1)
//!   cargo run -- --load clip.loop      (load a clip and play it)
//!   cargo run -- --smf out.mid         (demo, then export as SMF)

use std::path::Path;
use std::{env, process};

use lc_master::{Controller, OutboundMessage};
use lc_model::{QuantizeGrid, ShortMessage, TrackState};
use ringbuf::traits::Consumer;

type Outbound = ringbuf::HeapCons<OutboundMessage>;

fn main() {
    let args: Vec<String> = env::args().collect();
    let flag_value = |flag: &str| {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .cloned()
    };

    let (mut ctrl, mut outbound) = Controller::new();

    if let Some(path) = flag_value("--load") {
        ctrl.load_clip(0, Path::new(&path)).unwrap_or_else(|e| {
            eprintln!("Failed to load {}: {}", path, e);
            process::exit(1);
        });
        println!("Loaded {} into track 1", path);
    } else {
        record_demo(&mut ctrl, &mut outbound);
    }

    play_loops(&mut ctrl, &mut outbound, 2);

    if let Some(path) = flag_value("--save") {
        ctrl.save_clip(0, Path::new(&path)).unwrap_or_else(|e| {
            eprintln!("Failed to save {}: {}", path, e);
            process::exit(1);
        });
        println!("Saved track 1 to {}", path);
    }
    if let Some(path) = flag_value("--smf") {
        ctrl.export_smf(0, Path::new(&path)).unwrap_or_else(|e| {
            eprintln!("Failed to export {}: {}", path, e);
            process::exit(1);
        });
        println!("Exported track 1 to {}", path);
    }
}

/// Advance the clock by hand, draining (and discarding) outbound traffic.
fn run_ms(ctrl: &mut Controller, outbound: &mut Outbound, ms: u32) {
    for _ in 0..ms {
        ctrl.tick_1ms();
        while outbound.try_pop().is_some() {}
    }
}

fn note(status: u8, note: u8, velocity: u8) -> ShortMessage {
    ShortMessage::ThreeByte { status, data1: note, data2: velocity }
}

/// Record a one-bar figure onto track 1 with sixteenth-note quantize.
fn record_demo(ctrl: &mut Controller, outbound: &mut Outbound) {
    ctrl.set_tempo(120);
    ctrl.set_loop_beats(0, 4).expect("track 1 exists");
    ctrl.set_quantize(0, QuantizeGrid::Sixteenth).expect("track 1 exists");

    println!("Recording one bar on track 1 (120 BPM, 1/16 quantize)...");
    ctrl.set_state(0, TrackState::Rec).expect("track 1 exists");

    // A quarter note is 500 ms at 120 BPM.
    for (wait_ms, key) in [(0u32, 60u8), (500, 64), (500, 67), (500, 72)] {
        run_ms(ctrl, outbound, wait_ms);
        ctrl.handle_message(0, note(0x90, key, 100));
        run_ms(ctrl, outbound, 240);
        ctrl.handle_message(0, note(0x80, key, 0));
        println!("  note {:3} at quantized grid", key);
    }

    run_ms(ctrl, outbound, 260); // finish the bar
    ctrl.set_state(0, TrackState::Stop).expect("track 1 exists");

    let events = ctrl.export_events(0).expect("track 1 exists");
    println!("Captured {} events:", events.len());
    for ev in &events {
        let (b0, b1, b2) = ev.msg.bytes();
        println!("  [{:2}] tick {:4}  {:02X} {:02X} {:02X}", ev.index, ev.tick, b0, b1, b2);
    }
}

/// Play the recorded loop for `loops` passes, printing every emission.
fn play_loops(ctrl: &mut Controller, outbound: &mut Outbound, loops: u32) {
    let events = ctrl.export_events(0).unwrap_or_default();
    if events.is_empty() {
        println!("Track 1 is empty; nothing to play.");
        return;
    }

    ctrl.set_state(0, TrackState::Play).expect("track 1 exists");
    println!("Playing {} loops:", loops);

    // One bar at 120 BPM is 2000 ms.
    for ms in 0..loops * 2000 {
        ctrl.tick_1ms();
        while let Some(out) = outbound.try_pop() {
            let (b0, b1, b2) = out.msg.bytes();
            println!("  {:6} ms  {:02X} {:02X} {:02X}", ms, b0, b1, b2);
        }
    }
    ctrl.set_state(0, TrackState::Stop).expect("track 1 exists");
    println!("Done.");
}
