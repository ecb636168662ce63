//! Model registry
//!
//! A [`Model`] is an immutable bundle of decode resources shared by every
//! session built on it. Handles are reference counted; the resources are torn
//! down exactly once, when the last handle goes away.

use crate::config::ModelConfig;
use crate::error::{VRecogError, VRecogResult};
use crate::model::acoustic::AcousticModel;
use crate::model::graph::GraphResources;
use crate::model::rescoring::RescoringLm;
use crate::model::symbols::{SymbolTable, WordId, EPSILON_ID};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

/// Maximum number of default wake phrases
pub const MAX_WAKE_PHRASES: usize = 2;

/// Which resource sets [`Model::load`] parses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelMode {
    Asr,
    Kws,
    /// Both; succeeds if at least one set loads
    Both,
}

impl ModelMode {
    /// C ABI encoding: 0 = ASR, 1 = KWS, 2 = both
    pub fn from_raw(raw: i32) -> VRecogResult<Self> {
        match raw {
            0 => Ok(Self::Asr),
            1 => Ok(Self::Kws),
            2 => Ok(Self::Both),
            other => Err(VRecogError::InvalidConfig(format!("unknown model mode {}", other))),
        }
    }

    fn wants_asr(self) -> bool {
        matches!(self, Self::Asr | Self::Both)
    }

    fn wants_kws(self) -> bool {
        matches!(self, Self::Kws | Self::Both)
    }
}

/// One complete resource set (the ASR root or `kws/`)
#[derive(Debug)]
pub struct DecodeResources {
    pub config: ModelConfig,
    pub symbols: Arc<SymbolTable>,
    pub acoustic: Arc<AcousticModel>,
    pub graph: GraphResources,
    pub rescoring: Option<Arc<RescoringLm>>,
}

impl DecodeResources {
    fn load(dir: &Path) -> VRecogResult<Self> {
        let config = ModelConfig::load(dir)?;
        let symbols = SymbolTable::load(&dir.join("graph").join("words.txt"))?;
        let acoustic = AcousticModel::load(&dir.join("am").join("units.toml"), &symbols)?;
        let graph = GraphResources::load(&dir.join("graph"), &symbols)?;

        let lm_path = dir.join("rescore").join("lm.txt");
        let rescoring = if lm_path.exists() {
            Some(Arc::new(RescoringLm::load(&lm_path, &symbols)?))
        } else {
            None
        };

        Ok(Self {
            config,
            symbols: Arc::new(symbols),
            acoustic: Arc::new(acoustic),
            graph,
            rescoring,
        })
    }

    /// A resource set is present once its symbol table exists
    fn present(dir: &Path) -> bool {
        dir.join("graph").join("words.txt").exists()
    }
}

#[derive(Debug)]
struct ModelResources {
    path: PathBuf,
    asr: Option<Arc<DecodeResources>>,
    kws: Option<Arc<DecodeResources>>,
    wake_phrases: Vec<String>,
}

impl Drop for ModelResources {
    fn drop(&mut self) {
        tracing::info!("Model resources released: {:?}", self.path);
    }
}

/// Reference-counted handle to loaded resources
#[derive(Debug, Clone)]
pub struct Model {
    inner: Arc<ModelResources>,
}

/// Non-owning handle, does not keep resources alive
#[derive(Debug, Clone)]
pub struct WeakModel {
    inner: Weak<ModelResources>,
}

impl WeakModel {
    /// Whether the resources are still loaded
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    pub fn upgrade(&self) -> Option<Model> {
        self.inner.upgrade().map(|inner| Model { inner })
    }
}

impl Model {
    /// Load the resource sets selected by `mode` from `path`
    pub fn load(path: impl AsRef<Path>, mode: ModelMode) -> VRecogResult<Self> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(VRecogError::model_load(path, "model directory not found"));
        }

        tracing::info!("Loading model {:?} ({:?})", path, mode);

        let asr = if mode.wants_asr() {
            Self::load_set(path, mode, "ASR")?
        } else {
            None
        };

        let kws_dir = path.join("kws");
        let kws = if mode.wants_kws() {
            Self::load_set(&kws_dir, mode, "KWS")?
        } else {
            None
        };

        if asr.is_none() && kws.is_none() {
            return Err(VRecogError::model_load(path, "no ASR or KWS resources found"));
        }

        let wake_phrases = if kws.is_some() {
            load_wake_phrases(&kws_dir.join("wake_words.txt"))?
        } else {
            Vec::new()
        };

        tracing::info!(
            "✅ Model loaded: asr_ready={}, kws_ready={}, wake phrases={:?}",
            asr.is_some(),
            kws.is_some(),
            wake_phrases
        );

        Ok(Self {
            inner: Arc::new(ModelResources {
                path: path.to_path_buf(),
                asr: asr.map(Arc::new),
                kws: kws.map(Arc::new),
                wake_phrases,
            }),
        })
    }

    /// In `Both` mode an absent set is tolerated; a corrupt one never is
    fn load_set(dir: &Path, mode: ModelMode, label: &str) -> VRecogResult<Option<DecodeResources>> {
        if !DecodeResources::present(dir) {
            if mode == ModelMode::Both {
                tracing::warn!("{} resources not found under {:?}, skipping", label, dir);
                return Ok(None);
            }
            return Err(VRecogError::model_load(
                dir,
                format!("{} resources not found (graph/words.txt missing)", label),
            ));
        }
        DecodeResources::load(dir).map(Some)
    }

    /// Take another reference
    pub fn acquire(&self) -> Self {
        self.clone()
    }

    /// Drop this reference; the last release tears the resources down
    pub fn release(self) {
        drop(self);
    }

    /// Live strong references
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    pub fn downgrade(&self) -> WeakModel {
        WeakModel {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn asr_ready(&self) -> bool {
        self.inner.asr.is_some()
    }

    pub fn kws_ready(&self) -> bool {
        self.inner.kws.is_some()
    }

    /// Word id in the ASR symbol table (KWS table when ASR is absent).
    /// `<eps>` resolves to the reserved epsilon id.
    pub fn find_word(&self, word: &str) -> Option<WordId> {
        if word == "<eps>" {
            return Some(EPSILON_ID);
        }
        self.primary_resources().symbols.find(word)
    }

    /// Default wake phrases from `kws/wake_words.txt`
    pub fn wake_phrases(&self) -> &[String] {
        &self.inner.wake_phrases
    }

    /// Ids of every word of the default wake phrases, in phrase order
    pub fn wake_word_ids(&self) -> Vec<WordId> {
        let Some(kws) = &self.inner.kws else {
            return Vec::new();
        };
        self.inner
            .wake_phrases
            .iter()
            .flat_map(|phrase| phrase.split_whitespace())
            .filter_map(|word| kws.symbols.find(word))
            .collect()
    }

    pub(crate) fn asr_resources(&self) -> Option<&Arc<DecodeResources>> {
        self.inner.asr.as_ref()
    }

    pub(crate) fn kws_resources(&self) -> Option<&Arc<DecodeResources>> {
        self.inner.kws.as_ref()
    }

    fn primary_resources(&self) -> &DecodeResources {
        match (&self.inner.asr, &self.inner.kws) {
            (Some(asr), _) => asr,
            (None, Some(kws)) => kws,
            // load() rejects models with neither set
            (None, None) => unreachable!("model without resources"),
        }
    }
}

fn load_wake_phrases(path: &Path) -> VRecogResult<Vec<String>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| VRecogError::model_load(path, e.to_string()))?;
    let phrases: Vec<String> = content
        .lines()
        .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .collect();

    if phrases.len() > MAX_WAKE_PHRASES {
        return Err(VRecogError::model_load(
            path,
            format!("at most {} wake phrases supported, found {}", MAX_WAKE_PHRASES, phrases.len()),
        ));
    }
    Ok(phrases)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_set(dir: &Path, words: &[&str], composable: bool) {
        std::fs::create_dir_all(dir.join("graph")).unwrap();
        std::fs::create_dir_all(dir.join("am")).unwrap();

        let mut table = String::from("<eps> 0\n");
        let mut units = String::new();
        for (i, word) in words.iter().enumerate() {
            table.push_str(&format!("{} {}\n", word, i + 1));
            units.push_str(&format!(
                "[[units]]\nword = \"{}\"\nfreq_hz = {}\n\n",
                word,
                400 + 300 * i
            ));
        }
        std::fs::write(dir.join("graph/words.txt"), table).unwrap();
        std::fs::write(dir.join("am/units.toml"), units).unwrap();

        let list = words.join("\n");
        if composable {
            std::fs::write(dir.join("graph/HCLr.fst"), &list).unwrap();
            std::fs::write(dir.join("graph/Gr.fst"), &list).unwrap();
        } else {
            std::fs::write(dir.join("graph/HCLG.fst"), &list).unwrap();
        }
    }

    #[test]
    fn test_load_asr_only() {
        let dir = tempfile::tempdir().unwrap();
        write_set(dir.path(), &["yes", "no"], false);

        let model = Model::load(dir.path(), ModelMode::Asr).unwrap();
        assert!(model.asr_ready());
        assert!(!model.kws_ready());
        assert_eq!(model.find_word("no"), Some(2));
        assert_eq!(model.find_word("<eps>"), Some(EPSILON_ID));
        assert_eq!(model.find_word("maybe"), None);
    }

    #[test]
    fn test_missing_set_for_mode() {
        let dir = tempfile::tempdir().unwrap();
        write_set(dir.path(), &["yes"], false);

        assert!(matches!(
            Model::load(dir.path(), ModelMode::Kws),
            Err(VRecogError::ModelLoad { .. })
        ));
    }

    #[test]
    fn test_both_allows_partial_success() {
        let dir = tempfile::tempdir().unwrap();
        write_set(&dir.path().join("kws"), &["hello", "system"], true);
        std::fs::write(dir.path().join("kws/wake_words.txt"), "hello system\n").unwrap();

        let model = Model::load(dir.path(), ModelMode::Both).unwrap();
        assert!(!model.asr_ready());
        assert!(model.kws_ready());
        assert_eq!(model.wake_phrases(), ["hello system".to_string()]);
        assert_eq!(model.wake_word_ids(), vec![1, 2]);
    }

    #[test]
    fn test_corrupt_set_fails_even_in_both_mode() {
        let dir = tempfile::tempdir().unwrap();
        write_set(dir.path(), &["yes"], false);
        std::fs::write(dir.path().join("am/units.toml"), "[[units]]\nword = 3").unwrap();

        assert!(Model::load(dir.path(), ModelMode::Both).is_err());
    }

    #[test]
    fn test_too_many_wake_phrases() {
        let dir = tempfile::tempdir().unwrap();
        write_set(&dir.path().join("kws"), &["a", "b", "c"], true);
        std::fs::write(dir.path().join("kws/wake_words.txt"), "a\nb\nc\n").unwrap();

        assert!(Model::load(dir.path(), ModelMode::Kws).is_err());
    }

    #[test]
    fn test_refcount_teardown() {
        let dir = tempfile::tempdir().unwrap();
        write_set(dir.path(), &["yes"], false);

        let model = Model::load(dir.path(), ModelMode::Asr).unwrap();
        let weak = model.downgrade();
        let a = model.acquire();
        let b = model.acquire();
        assert_eq!(model.ref_count(), 3);

        model.release();
        a.release();
        assert!(weak.is_alive());
        b.release();
        assert!(!weak.is_alive());
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_mode_from_raw() {
        assert_eq!(ModelMode::from_raw(0).unwrap(), ModelMode::Asr);
        assert_eq!(ModelMode::from_raw(2).unwrap(), ModelMode::Both);
        assert!(ModelMode::from_raw(7).is_err());
    }
}
