//! Fixture models and synthetic audio
//!
//! Shared with the crate's unit tests. Acoustic unit `i` is a pure tone at
//! `400 + 300 * i` Hz, so synthetic audio decodes to known words.

#![allow(dead_code)]

use std::path::Path;

pub const SAMPLE_RATE: f32 = 16000.0;

/// Words of the full-vocabulary set, in unit order
pub const ASR_WORDS: [&str; 4] = ["hello", "system", "yes", "no"];
/// Words of the `kws/` set, in unit order
pub const KWS_WORDS: [&str; 2] = ["hello", "system"];

pub fn unit_freq(index: usize) -> f32 {
    400.0 + 300.0 * index as f32
}

/// Tone of the full-vocabulary unit for `word`
pub fn word_freq(word: &str) -> f32 {
    let index = ASR_WORDS
        .iter()
        .position(|w| *w == word)
        .unwrap_or_else(|| panic!("no unit for {}", word));
    unit_freq(index)
}

pub fn write_set(dir: &Path, words: &[&str], composable: bool) {
    std::fs::create_dir_all(dir.join("graph")).unwrap();
    std::fs::create_dir_all(dir.join("am")).unwrap();
    std::fs::create_dir_all(dir.join("conf")).unwrap();

    let mut table = String::from("<eps> 0\n");
    let mut units = String::new();
    for (i, word) in words.iter().enumerate() {
        table.push_str(&format!("{} {}\n", word, i + 1));
        units.push_str(&format!(
            "[[units]]\nword = \"{}\"\nfreq_hz = {:.1}\n\n",
            word,
            unit_freq(i)
        ));
    }
    table.push_str(&format!("[unk] {}\n", words.len() + 1));
    std::fs::write(dir.join("graph/words.txt"), table).unwrap();
    std::fs::write(dir.join("am/units.toml"), units).unwrap();

    let list = format!("# fixture graph\n{}\n[unk]\n", words.join("\n"));
    if composable {
        std::fs::write(dir.join("graph/HCLr.fst"), &list).unwrap();
        std::fs::write(dir.join("graph/Gr.fst"), &list).unwrap();
    } else {
        std::fs::write(dir.join("graph/HCLG.fst"), &list).unwrap();
    }

    std::fs::write(
        dir.join("conf/model.toml"),
        r#"
[decoding]
min_word_frames = 3

[[endpoint.rules]]
must_contain_nonsilence = false
min_trailing_silence_s = 5.0

[[endpoint.rules]]
must_contain_nonsilence = true
min_trailing_silence_s = 1.0

[[endpoint.rules]]
min_utterance_length_s = 20.0
"#,
    )
    .unwrap();
}

/// Full model: composable (or precompiled) ASR set plus a `kws/` set with
/// "hello system" as default wake phrase
pub fn write_model(dir: &Path, composable: bool) {
    write_set(dir, &ASR_WORDS, composable);
    write_set(&dir.join("kws"), &KWS_WORDS, true);
    std::fs::write(dir.join("kws/wake_words.txt"), "# default\nhello system\n").unwrap();
}

pub fn tone(freq: f32, seconds: f32) -> Vec<f32> {
    let n = (SAMPLE_RATE * seconds) as usize;
    (0..n)
        .map(|i| 0.3 * (2.0 * std::f32::consts::PI * freq * i as f32 / SAMPLE_RATE).sin())
        .collect()
}

pub fn word(word: &str, seconds: f32) -> Vec<f32> {
    tone(word_freq(word), seconds)
}

pub fn silence(seconds: f32) -> Vec<f32> {
    vec![0.0; (SAMPLE_RATE * seconds) as usize]
}

/// Deterministic low-level noise, well under the silence floor
pub fn quiet_noise(seconds: f32) -> Vec<f32> {
    let mut state: u32 = 0x1234_5678;
    (0..(SAMPLE_RATE * seconds) as usize)
        .map(|_| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            ((state >> 8) as f32 / (1u32 << 24) as f32 - 0.5) * 0.001
        })
        .collect()
}

pub fn to_i16(samples: &[f32]) -> Vec<i16> {
    samples.iter().map(|s| (s * 32767.0) as i16).collect()
}

pub fn to_pcm_bytes(samples: &[f32]) -> Vec<u8> {
    to_i16(samples).iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Unsigned 8-bit PCM, 128 is silence
pub fn to_u8(samples: &[f32]) -> Vec<u8> {
    samples.iter().map(|s| (s * 127.0 + 128.0) as u8).collect()
}
