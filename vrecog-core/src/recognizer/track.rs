//! Decode track
//!
//! A track owns the transient engines of one decoding stream (feature
//! pipeline, decoder, optional speaker features) bound to shared model
//! resources. Engines are rebuilt for every utterance.

use super::speaker::SpeakerFeatures;
use super::state::{TrackEvent, TrackKind, TrackState};
use crate::audio::{FeaturePipeline, FilterbankPipeline};
use crate::decoder::{DecoderEngine, FrameSyncDecoder, HypWord};
use crate::endpointing::{DecodeProgress, EndpointDetector, EndpointDetectorConfig};
use crate::error::{VRecogError, VRecogResult};
use crate::model::{DecodeResources, SearchGraph, SpeakerModel, SymbolTable};
use crate::result::{FrameTiming, Utterance};
use std::sync::Arc;

pub(crate) struct Track {
    kind: TrackKind,
    state: TrackState,
    resources: Arc<DecodeResources>,
    graph: Arc<SearchGraph>,
    sample_rate: f32,
    pipeline: Box<dyn FeaturePipeline>,
    decoder: Box<dyn DecoderEngine>,
    speaker_model: Option<SpeakerModel>,
    speaker: Option<SpeakerFeatures>,
    endpoint: EndpointDetector,
    /// Rescoring applies to full-vocabulary decoding only
    rescore: bool,
    utterance_start: u64,
    utterance_samples: u64,
    last_utterance: Option<Utterance>,
}

impl Track {
    pub fn new(
        kind: TrackKind,
        resources: Arc<DecodeResources>,
        graph: Arc<SearchGraph>,
        sample_rate: f32,
        speaker_model: Option<SpeakerModel>,
    ) -> Self {
        let rescore = resources.rescoring.is_some()
            && Arc::ptr_eq(&graph, resources.graph.full_graph());

        let pipeline = Self::new_pipeline(&resources, sample_rate);
        let shift_s = pipeline.frame_shift_samples() as f32 / sample_rate;
        let endpoint = EndpointDetector::new(EndpointDetectorConfig::new(
            &resources.config.endpoint,
            shift_s,
        ));
        let decoder = Self::new_decoder(&resources, &graph);
        let speaker = speaker_model
            .clone()
            .map(|m| SpeakerFeatures::new(m, sample_rate, &resources.config.features));

        tracing::debug!(
            "Track {} created: {} graph words, rescore={}, speaker={}",
            kind,
            graph.vocabulary().len(),
            rescore,
            speaker.is_some()
        );

        Self {
            kind,
            state: TrackState::Initialized,
            resources,
            graph,
            sample_rate,
            pipeline,
            decoder,
            speaker_model,
            speaker,
            endpoint,
            rescore,
            utterance_start: 0,
            utterance_samples: 0,
            last_utterance: None,
        }
    }

    fn new_pipeline(resources: &DecodeResources, sample_rate: f32) -> Box<dyn FeaturePipeline> {
        Box::new(FilterbankPipeline::new(
            sample_rate,
            &resources.config.features,
            &resources.acoustic.band_centers(),
        ))
    }

    fn new_decoder(resources: &DecodeResources, graph: &Arc<SearchGraph>) -> Box<dyn DecoderEngine> {
        Box::new(FrameSyncDecoder::new(
            &resources.acoustic,
            Arc::clone(graph),
            &resources.config,
        ))
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn state(&self) -> TrackState {
        self.state
    }

    pub fn symbols(&self) -> &Arc<SymbolTable> {
        &self.resources.symbols
    }

    pub fn frame_shift_samples(&self) -> usize {
        self.pipeline.frame_shift_samples()
    }

    pub fn frame_length_samples(&self) -> usize {
        self.pipeline.frame_length_samples()
    }

    pub fn timing(&self) -> FrameTiming {
        FrameTiming {
            start_sample: self.utterance_start,
            shift_samples: self.pipeline.frame_shift_samples(),
            sample_rate: self.sample_rate,
        }
    }

    /// Audio accepted for the current utterance
    pub fn audio_seconds(&self) -> f32 {
        (self.utterance_samples as f64 / self.sample_rate as f64) as f32
    }

    pub fn last_utterance(&self) -> Option<&Utterance> {
        self.last_utterance.as_ref()
    }

    fn transition(&mut self, event: TrackEvent) -> VRecogResult<()> {
        let next = self.state.on(self.kind, event)?;
        if next != self.state {
            tracing::debug!("Track {}: {:?} -> {:?}", self.kind, self.state, next);
        }
        self.state = next;
        Ok(())
    }

    /// Start the next utterance if the previous one has ended
    pub fn reset_if_endpoint(&mut self) -> VRecogResult<()> {
        if self.state == TrackState::Endpoint {
            self.transition(TrackEvent::Reset)?;
            self.pipeline = Self::new_pipeline(&self.resources, self.sample_rate);
            self.decoder = Self::new_decoder(&self.resources, &self.graph);
            self.speaker = self.speaker_model.clone().map(|m| {
                SpeakerFeatures::new(m, self.sample_rate, &self.resources.config.features)
            });
        }
        Ok(())
    }

    /// Feed canonical samples starting at stream sample `start_sample`
    pub fn accept(&mut self, samples: &[f32], start_sample: u64) -> VRecogResult<()> {
        self.reset_if_endpoint()?;
        let was_idle = self.state == TrackState::Initialized;
        self.transition(TrackEvent::Audio)?;
        if was_idle {
            self.utterance_start = start_sample;
            self.utterance_samples = 0;
        }
        self.utterance_samples += samples.len() as u64;

        self.pipeline.accept_waveform(samples);
        if let Some(speaker) = self.speaker.as_mut() {
            speaker.accept_waveform(samples);
        }
        self.decoder.advance_decoding(self.pipeline.as_ref());
        Ok(())
    }

    /// Evaluate endpoint rules; finalizes the utterance when one fires
    pub fn check_endpoint(&mut self, external: bool) -> VRecogResult<bool> {
        if self.state != TrackState::Running {
            return Ok(false);
        }
        let result = self
            .endpoint
            .evaluate(&DecodeProgress::of(self.decoder.as_ref(), self.audio_seconds()), external);
        if !result.is_endpoint() {
            return Ok(false);
        }

        tracing::info!("Track {}: endpoint ({:?})", self.kind, result);
        self.end_utterance(false)?;
        Ok(true)
    }

    /// Finalize the running utterance and keep its result.
    /// `flush` also decodes the partial trailing window.
    pub fn end_utterance(&mut self, flush: bool) -> VRecogResult<()> {
        if self.state != TrackState::Running {
            return Err(VRecogError::InvalidTransition {
                track: self.kind.to_string(),
                from: format!("{:?}", self.state),
                event: format!("{:?}", TrackEvent::Endpoint),
            });
        }

        if flush {
            self.pipeline.input_finished();
            if let Some(speaker) = self.speaker.as_mut() {
                speaker.input_finished();
            }
            self.decoder.advance_decoding(self.pipeline.as_ref());
        }
        self.decoder.finalize_decoding();

        let mut lattice = self.decoder.lattice();
        if self.rescore {
            if let Some(lm) = &self.resources.rescoring {
                lattice.rescore(lm, self.resources.config.rescoring.lm_weight);
            }
        }
        let speaker = self
            .speaker
            .as_ref()
            .map(|s| s.embedding(self.decoder.frame_weights()));

        tracing::debug!(
            "Track {}: utterance finalized ({} words, {} frames)",
            self.kind,
            lattice.slots().len(),
            self.decoder.num_frames_decoded()
        );

        self.last_utterance = Some(Utterance {
            lattice,
            symbols: Arc::clone(&self.resources.symbols),
            timing: self.timing(),
            speaker,
        });
        self.transition(TrackEvent::Endpoint)
    }

    /// Current best words, including one still being spoken
    pub fn partial_words(&self) -> Vec<HypWord> {
        match self.state {
            TrackState::Running => self.decoder.best_path(),
            _ => Vec::new(),
        }
    }

    /// Words that can no longer change
    pub fn completed_words(&self) -> Vec<HypWord> {
        match self.state {
            TrackState::Running => self.decoder.completed_words(),
            _ => Vec::new(),
        }
    }

    /// Result of the current utterance, finalizing it if still running
    pub fn force_result(&mut self) -> VRecogResult<Option<&Utterance>> {
        match self.state {
            TrackState::Running => {
                self.end_utterance(true)?;
                Ok(self.last_utterance.as_ref())
            }
            TrackState::Endpoint => Ok(self.last_utterance.as_ref()),
            TrackState::Initialized => Ok(None),
            TrackState::Finalized => Err(VRecogError::SessionClosed),
        }
    }

    /// Close the track; returns the pending or just-finalized utterance
    pub fn finish(&mut self) -> VRecogResult<Option<Utterance>> {
        let pending = match self.state {
            TrackState::Running => {
                self.end_utterance(true)?;
                self.last_utterance.take()
            }
            TrackState::Endpoint => self.last_utterance.take(),
            TrackState::Initialized => None,
            TrackState::Finalized => return Err(VRecogError::SessionClosed),
        };
        self.transition(TrackEvent::Finalize)?;
        Ok(pending)
    }
}
