//! Recognizer session
//!
//! Per-stream controller. A session owns one of three track layouts:
//! recognition only, keyword spotting only, or both with automatic handoff
//! from a detected wake phrase to recognition. All engines are owned by the
//! tracks and released with the session; the model handle it holds keeps
//! the shared resources alive.

use super::state::{TrackKind, TrackState};
use super::track::Track;
use crate::audio::AudioBuffer;
use crate::error::{VRecogError, VRecogResult};
use crate::grammar::{CompiledGrammar, Grammar};
use crate::model::{Model, SpeakerModel, UNK_WORD};
use crate::result::{ResultFormatter, WakeDetection};
use crate::runtime;
use std::borrow::Cow;
use std::sync::Arc;

enum Tracks {
    Asr(Track),
    Kws {
        kws: Track,
        grammar: CompiledGrammar,
    },
    Dual {
        kws: Track,
        asr: Track,
        grammar: CompiledGrammar,
    },
}

impl Tracks {
    /// Track whose results `result()` and `final_result()` report
    fn primary(&self) -> &Track {
        match self {
            Self::Asr(asr) | Self::Dual { asr, .. } => asr,
            Self::Kws { kws, .. } => kws,
        }
    }

    fn primary_mut(&mut self) -> &mut Track {
        match self {
            Self::Asr(asr) | Self::Dual { asr, .. } => asr,
            Self::Kws { kws, .. } => kws,
        }
    }

    fn grammar(&self) -> Option<&CompiledGrammar> {
        match self {
            Self::Asr(_) => None,
            Self::Kws { grammar, .. } | Self::Dual { grammar, .. } => Some(grammar),
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Self::Asr(_) => "asr",
            Self::Kws { .. } => "kws",
            Self::Dual { .. } => "kws+asr",
        }
    }
}

/// A wake phrase found in the chunk just decoded
struct Spotted {
    detection: WakeDetection,
    /// First stream sample after the phrase
    end_sample: u64,
}

/// Audio after a detection that the keyword track has not decoded yet
struct HeldAudio {
    start_sample: u64,
    samples: Vec<f32>,
}

/// Streaming recognizer bound to one audio stream.
///
/// Not thread-safe for concurrent calls; sessions on different threads may
/// share one [`Model`].
pub struct RecognizerSession {
    model: Model,
    speaker_model: Option<SpeakerModel>,
    sample_rate: f32,
    tracks: Tracks,
    formatter: ResultFormatter,
    samples_accepted: u64,
    last_detection: Option<WakeDetection>,
    /// Fed to the keyword track ahead of the next chunk, so the detection
    /// stays pending until then
    held_kws_audio: Option<HeldAudio>,
    closed: bool,
}

impl RecognizerSession {
    /// Plain full-vocabulary recognizer
    pub fn new(model: &Model, sample_rate: f32) -> VRecogResult<Self> {
        Self::build(model, None, sample_rate, None)
    }

    /// Recognizer with speaker embeddings in every result
    pub fn with_speaker(model: &Model, speaker: &SpeakerModel, sample_rate: f32) -> VRecogResult<Self> {
        Self::build(model, Some(speaker), sample_rate, None)
    }

    /// Keyword spotter over a JSON phrase list
    pub fn with_wake_words(model: &Model, sample_rate: f32, grammar: &str) -> VRecogResult<Self> {
        Self::build(model, None, sample_rate, Some((grammar, false)))
    }

    /// Keyword spotter; with `do_asr` a detected phrase starts recognition
    /// on the rest of the stream
    pub fn with_grammar(
        model: &Model,
        sample_rate: f32,
        grammar: &str,
        do_asr: bool,
    ) -> VRecogResult<Self> {
        Self::build(model, None, sample_rate, Some((grammar, do_asr)))
    }

    /// Wake-word handoff with speaker embeddings on the recognition results
    pub fn with_grammar_and_speaker(
        model: &Model,
        speaker: &SpeakerModel,
        sample_rate: f32,
        grammar: &str,
    ) -> VRecogResult<Self> {
        Self::build(model, Some(speaker), sample_rate, Some((grammar, true)))
    }

    fn build(
        model: &Model,
        speaker: Option<&SpeakerModel>,
        sample_rate: f32,
        wake: Option<(&str, bool)>,
    ) -> VRecogResult<Self> {
        if !(sample_rate.is_finite() && sample_rate >= 1000.0) {
            return Err(VRecogError::InvalidConfig(format!(
                "unsupported sample rate {}",
                sample_rate
            )));
        }
        runtime::gpu::warn_if_thread_uninitialized();

        let speaker = speaker.map(SpeakerModel::acquire);

        let tracks = match wake {
            None => {
                let asr = model.asr_resources().ok_or_else(|| {
                    VRecogError::model_load(model.path(), "ASR resources not loaded")
                })?;
                let graph = Arc::clone(asr.graph.full_graph());
                Tracks::Asr(Track::new(
                    TrackKind::Asr,
                    Arc::clone(asr),
                    graph,
                    sample_rate,
                    speaker.clone(),
                ))
            }
            Some((grammar_json, do_asr)) => {
                let resources = model
                    .kws_resources()
                    .or_else(|| model.asr_resources())
                    .ok_or_else(|| VRecogError::model_load(model.path(), "no resources loaded"))?;
                let lexicon = resources.graph.lexicon()?;

                let asr = if do_asr {
                    Some(model.asr_resources().ok_or_else(|| {
                        VRecogError::model_load(model.path(), "wake-word handoff needs ASR resources")
                    })?)
                } else {
                    None
                };

                let mut grammar = Grammar::parse(grammar_json)?;
                if grammar.phrases().is_empty() {
                    if model.wake_phrases().is_empty() {
                        return Err(VRecogError::Grammar(
                            "empty grammar and the model has no default wake phrases".into(),
                        ));
                    }
                    tracing::info!("Empty grammar, using default wake phrases {:?}", model.wake_phrases());
                    let unk = grammar.has_unk().then_some(UNK_WORD);
                    grammar = Grammar::from_phrases(
                        model.wake_phrases().iter().map(String::as_str).chain(unk),
                    );
                }
                let compiled = grammar.compile(lexicon, &resources.symbols)?;

                match asr {
                    Some(asr) => {
                        let kws = Track::new(
                            TrackKind::Kws,
                            Arc::clone(resources),
                            Arc::clone(compiled.graph()),
                            sample_rate,
                            None,
                        );
                        let asr = Track::new(
                            TrackKind::Asr,
                            Arc::clone(asr),
                            Arc::clone(asr.graph.full_graph()),
                            sample_rate,
                            speaker.clone(),
                        );
                        Tracks::Dual {
                            kws,
                            asr,
                            grammar: compiled,
                        }
                    }
                    None => Tracks::Kws {
                        kws: Track::new(
                            TrackKind::Kws,
                            Arc::clone(resources),
                            Arc::clone(compiled.graph()),
                            sample_rate,
                            speaker.clone(),
                        ),
                        grammar: compiled,
                    },
                }
            }
        };

        tracing::info!(
            "Recognizer session created: tracks={}, sample_rate={}, speaker={}",
            tracks.describe(),
            sample_rate,
            speaker.is_some()
        );

        Ok(Self {
            model: model.acquire(),
            speaker_model: speaker,
            sample_rate,
            tracks,
            formatter: ResultFormatter::default(),
            samples_accepted: 0,
            last_detection: None,
            held_kws_audio: None,
            closed: false,
        })
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn speaker_model(&self) -> Option<&SpeakerModel> {
        self.speaker_model.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Total samples accepted so far
    pub fn samples_accepted(&self) -> u64 {
        self.samples_accepted
    }

    pub fn asr_state(&self) -> Option<TrackState> {
        match &self.tracks {
            Tracks::Asr(asr) | Tracks::Dual { asr, .. } => Some(asr.state()),
            Tracks::Kws { .. } => None,
        }
    }

    pub fn kws_state(&self) -> Option<TrackState> {
        match &self.tracks {
            Tracks::Kws { kws, .. } | Tracks::Dual { kws, .. } => Some(kws.state()),
            Tracks::Asr(_) => None,
        }
    }

    pub fn last_detection(&self) -> Option<&WakeDetection> {
        self.last_detection.as_ref()
    }

    /// 0 (default) reports the single best path; k > 0 reports up to k
    /// alternatives
    pub fn set_max_alternatives(&mut self, max_alternatives: usize) {
        self.formatter.set_max_alternatives(max_alternatives);
    }

    pub fn max_alternatives(&self) -> usize {
        self.formatter.max_alternatives()
    }

    /// Whether every word of `word` is in the session's grammar vocabulary
    pub fn check_wake_availability(&self, word: &str) -> bool {
        self.tracks
            .grammar()
            .is_some_and(|grammar| grammar.contains(word))
    }

    fn ensure_open(&self) -> VRecogResult<()> {
        if self.closed {
            Err(VRecogError::SessionClosed)
        } else {
            Ok(())
        }
    }

    /// Feed one chunk of audio.
    ///
    /// Returns `true` when the chunk completed an utterance: a recognition
    /// endpoint, or for keyword-only sessions a detection or endpoint. With
    /// `external_endpoint` every running track is endpointed after this
    /// chunk. An empty chunk is a no-op.
    pub fn accept_waveform(
        &mut self,
        audio: AudioBuffer<'_>,
        external_endpoint: bool,
    ) -> VRecogResult<bool> {
        self.ensure_open()?;
        if audio.is_empty() {
            return Ok(false);
        }

        let samples = audio.to_waveform()?;
        let chunk_start = self.samples_accepted;
        self.samples_accepted += samples.len() as u64;

        tracing::trace!(
            "Chunk of {} samples at {} ({})",
            samples.len(),
            chunk_start,
            self.tracks.describe()
        );

        let endpoint = match &mut self.tracks {
            Tracks::Asr(asr) => {
                asr.accept(&samples, chunk_start)?;
                asr.check_endpoint(external_endpoint)?
            }
            Tracks::Kws { kws, grammar } => {
                let (kws_start, kws_audio) =
                    Self::with_held(self.held_kws_audio.take(), &samples, chunk_start);
                kws.accept(&kws_audio, kws_start)?;
                match Self::spot(kws, grammar)? {
                    Some(spotted) => {
                        let offset = Self::offset_in(spotted.end_sample, kws_start, &kws_audio);
                        self.held_kws_audio = Self::hold(&kws_audio, kws_start, offset);
                        self.last_detection = Some(spotted.detection);
                        true
                    }
                    None => kws.check_endpoint(external_endpoint)?,
                }
            }
            Tracks::Dual { kws, asr, grammar } => {
                asr.reset_if_endpoint()?;
                if asr.state() == TrackState::Running {
                    asr.accept(&samples, chunk_start)?;
                }

                let (kws_start, kws_audio) =
                    Self::with_held(self.held_kws_audio.take(), &samples, chunk_start);
                kws.accept(&kws_audio, kws_start)?;
                match Self::spot(kws, grammar)? {
                    Some(spotted) => {
                        let offset = Self::offset_in(spotted.end_sample, kws_start, &kws_audio);
                        if asr.state() == TrackState::Initialized {
                            tracing::info!(
                                "🎯 Wake phrase '{}' starts recognition at sample {}",
                                spotted.detection.phrase,
                                kws_start + offset as u64
                            );
                            asr.accept(&kws_audio[offset..], kws_start + offset as u64)?;
                        }
                        self.held_kws_audio = Self::hold(&kws_audio, kws_start, offset);
                        self.last_detection = Some(spotted.detection);
                    }
                    None => {
                        kws.check_endpoint(external_endpoint)?;
                    }
                }

                asr.check_endpoint(external_endpoint)?
            }
        };

        Ok(endpoint)
    }

    /// Prepend audio held back from the previous detection
    fn with_held(
        held: Option<HeldAudio>,
        samples: &[f32],
        chunk_start: u64,
    ) -> (u64, Cow<'_, [f32]>) {
        match held {
            Some(mut held) => {
                held.samples.extend_from_slice(samples);
                (held.start_sample, Cow::Owned(held.samples))
            }
            None => (chunk_start, Cow::Borrowed(samples)),
        }
    }

    /// Index of stream sample `sample` within `audio`, clamped to its length
    fn offset_in(sample: u64, audio_start: u64, audio: &[f32]) -> usize {
        (sample.saturating_sub(audio_start) as usize).min(audio.len())
    }

    /// Keep what follows a detection; a second phrase may start there
    fn hold(audio: &[f32], audio_start: u64, offset: usize) -> Option<HeldAudio> {
        (offset < audio.len()).then(|| HeldAudio {
            start_sample: audio_start + offset as u64,
            samples: audio[offset..].to_vec(),
        })
    }

    /// Look for a wake phrase among the words the track has settled on;
    /// a hit ends the track's utterance
    fn spot(kws: &mut Track, grammar: &CompiledGrammar) -> VRecogResult<Option<Spotted>> {
        let words = kws.completed_words();
        let Some(found) = grammar.find_phrase(&words) else {
            return Ok(None);
        };

        let timing = kws.timing();
        let last_frame = found.end_frame.saturating_sub(1);
        let end_sample = timing.start_sample
            + (last_frame * kws.frame_shift_samples() + kws.frame_length_samples()) as u64;

        let detection = WakeDetection {
            phrase: found.phrase,
            start: timing.seconds(found.start_frame),
            end: timing.seconds(found.end_frame),
            confidence: found.confidence,
        };
        tracing::info!(
            "Wake phrase detected: '{}' ({:.2}s - {:.2}s, conf {:.3})",
            detection.phrase,
            detection.start,
            detection.end,
            detection.confidence
        );

        kws.end_utterance(false)?;
        Ok(Some(Spotted {
            detection,
            end_sample,
        }))
    }

    /// Result of the current utterance. A running utterance is finalized;
    /// the next chunk starts a new one.
    pub fn result(&mut self) -> VRecogResult<String> {
        self.ensure_open()?;
        let utterance = self.tracks.primary_mut().force_result()?;
        Ok(self.formatter.final_result(utterance))
    }

    /// Current best text; no state change
    pub fn partial_result(&self) -> VRecogResult<String> {
        self.ensure_open()?;
        let track = self.tracks.primary();
        let symbols = track.symbols();
        let text = track
            .partial_words()
            .iter()
            .filter_map(|w| symbols.word(w.word))
            .collect::<Vec<_>>()
            .join(" ");
        Ok(self.formatter.partial_result(&text))
    }

    /// Finalize every track and close the session
    pub fn final_result(&mut self) -> VRecogResult<String> {
        self.ensure_open()?;
        // A pending detection is the keyword result; audio held after it is dropped
        self.held_kws_audio = None;

        let utterance = match &mut self.tracks {
            Tracks::Asr(asr) => asr.finish()?,
            Tracks::Kws { kws, .. } => kws.finish()?,
            Tracks::Dual { kws, asr, .. } => {
                kws.finish()?;
                asr.finish()?
            }
        };
        self.closed = true;

        tracing::debug!(
            "Session finalized after {:.2}s of audio",
            self.samples_accepted as f64 / self.sample_rate as f64
        );
        Ok(self.formatter.final_result(utterance.as_ref()))
    }

    /// Last wake-phrase detection
    pub fn kws_result(&self) -> VRecogResult<String> {
        self.ensure_open()?;
        Ok(self.formatter.kws_result(self.last_detection.as_ref()))
    }

    /// Error rendered in the result schema, for callers that only take strings
    pub fn error_result(&self, err: &VRecogError) -> String {
        self.formatter.error(err)
    }
}

impl Drop for RecognizerSession {
    fn drop(&mut self) {
        tracing::debug!(
            "Recognizer session released ({}, model refs left: {})",
            self.tracks.describe(),
            self.model.ref_count().saturating_sub(1)
        );
    }
}
