//! Transcribe a 16-bit mono WAV file
//!
//! Usage:
//!   cargo run --example transcribe_wav -- <model_dir> <audio.wav> [grammar_json]
//!
//! With a grammar the session spots the wake phrases and hands off to
//! recognition after each detection.

use std::env;
use std::path::Path;
use vrecog_core::{AudioBuffer, Model, ModelMode, RecognizerSession, VRecogResult};

/// 200 ms per chunk, like a live capture callback
const CHUNK_MS: u32 = 200;

fn main() -> VRecogResult<()> {
    vrecog_core::init_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("usage: {} <model_dir> <audio.wav> [grammar_json]", args[0]);
        std::process::exit(2);
    }
    let model_dir = Path::new(&args[1]);
    let audio_path = Path::new(&args[2]);
    let grammar = args.get(3);

    let mut reader = match hound::WavReader::open(audio_path) {
        Ok(reader) => reader,
        Err(e) => {
            eprintln!("❌ Cannot open {:?}: {}", audio_path, e);
            std::process::exit(1);
        }
    };
    let spec = reader.spec();
    if spec.channels != 1 || spec.bits_per_sample != 16 {
        eprintln!(
            "❌ Expected 16-bit mono audio, got {} channels at {} bits",
            spec.channels, spec.bits_per_sample
        );
        std::process::exit(1);
    }
    let samples: Vec<i16> = reader.samples::<i16>().filter_map(Result::ok).collect();

    let mode = if grammar.is_some() { ModelMode::Both } else { ModelMode::Asr };
    let model = Model::load(model_dir, mode)?;
    let sample_rate = spec.sample_rate as f32;
    let mut session = match grammar {
        Some(grammar) => RecognizerSession::with_grammar(&model, sample_rate, grammar, true)?,
        None => RecognizerSession::new(&model, sample_rate)?,
    };

    println!(
        "📁 {:?}: {:.2}s at {} Hz",
        audio_path,
        samples.len() as f32 / sample_rate,
        spec.sample_rate
    );

    let chunk = (spec.sample_rate * CHUNK_MS / 1000) as usize;
    let mut reported_until = None;
    for data in samples.chunks(chunk) {
        if session.accept_waveform(AudioBuffer::Shorts(data), false)? {
            println!("{}", session.result()?);
        } else {
            println!("{}", session.partial_result()?);
        }
        let detected_until = session.last_detection().map(|d| d.end);
        if detected_until.is_some() && detected_until != reported_until {
            reported_until = detected_until;
            println!("🎯 {}", session.kws_result()?);
        }
    }

    println!("{}", session.final_result()?);
    Ok(())
}
