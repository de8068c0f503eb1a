//! Caller configuration and the per-contig values derived from it.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::stats::GenotypeParams;

/// Errors raised while loading or deriving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a configuration or depth file.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration document is not valid JSON for [`CallerConfig`].
    #[error("invalid configuration document: {0}")]
    Json(#[from] serde_json::Error),

    /// Depth table line is not `chrom<TAB>depth`.
    #[error("malformed chromosome depth line {line_number}: '{line}'")]
    MalformedDepthLine {
        /// 1-based line number.
        line_number: usize,
        /// Offending line.
        line: String,
    },

    /// Contig absent from the depth table while depth filtering is enabled.
    #[error("chromosome '{chrom}' not found in the chromosome depth table")]
    MissingChromDepth {
        /// Requested contig.
        chrom: String,
    },

    /// Phasing enabled with an empty window.
    #[error("phasing window must be at least 1 (got {0})")]
    InvalidWindow(u32),

    /// Threshold outside its valid range.
    #[error("invalid value {value} for {name}")]
    InvalidThreshold {
        /// Option name.
        name: &'static str,
        /// Rejected value.
        value: f64,
    },
}

/// Codon phasing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhasingOptions {
    /// Merge nearby heterozygous SNVs.
    pub enabled: bool,
    /// Hets closer than this many positions can be merged.
    pub window: u32,
}

impl Default for PhasingOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            window: 3,
        }
    }
}

/// Thresholds of the default (non-empirical) filters; `None` disables a filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterOptions {
    /// Minimum per-sample GQX.
    pub min_gqx: Option<i32>,
    /// Maximum depth as a multiple of the contig's expected depth.
    pub max_depth_factor: Option<f64>,
    /// Maximum fraction of basecalls filtered out at a site.
    pub max_base_filt: Option<f64>,
    /// Maximum SNV strand-bias score.
    pub max_snv_sb: Option<f64>,
    /// Maximum homopolymer length around an SNV.
    pub max_snv_hpol: Option<u32>,
    /// Maximum reference repeat count for short repeat units.
    pub max_ref_rep: Option<u32>,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            min_gqx: Some(30),
            max_depth_factor: Some(3.0),
            max_base_filt: Some(0.4),
            max_snv_sb: Some(10.0),
            max_snv_hpol: None,
            max_ref_rep: None,
        }
    }
}

impl FilterOptions {
    /// Every default filter switched off.
    pub fn disabled() -> Self {
        Self {
            min_gqx: None,
            max_depth_factor: None,
            max_base_filt: None,
            max_snv_sb: None,
            max_snv_hpol: None,
            max_ref_rep: None,
        }
    }
}

/// Empirical scoring settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringOptions {
    /// SNV model document.
    pub snv_model: Option<PathBuf>,
    /// Indel model document.
    pub indel_model: Option<PathBuf>,
    /// SNVs scoring below this get `LowGQX`.
    pub snv_evs_threshold: i32,
    /// Indels scoring below this get `LowGQX`.
    pub indel_evs_threshold: i32,
    /// Compute feature vectors for every usable variant.
    pub report_evs_features: bool,
}

impl Default for ScoringOptions {
    fn default() -> Self {
        Self {
            snv_model: None,
            indel_model: None,
            snv_evs_threshold: 8,
            indel_evs_threshold: 8,
            report_evs_features: false,
        }
    }
}

/// Complete caller configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallerConfig {
    /// Codon phasing.
    pub phasing: PhasingOptions,
    /// Default filters.
    pub filters: FilterOptions,
    /// Empirical scoring.
    pub scoring: ScoringOptions,
    /// Genotype priors.
    pub genotype: GenotypeParams,
    /// Tab-separated `chrom<TAB>depth` table enabling depth filtering.
    pub chrom_depth_file: Option<PathBuf>,
}

impl CallerConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Check option ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.phasing.enabled && self.phasing.window == 0 {
            return Err(ConfigError::InvalidWindow(self.phasing.window));
        }
        let fractions = [
            ("max_depth_factor", self.filters.max_depth_factor),
            ("max_snv_sb", self.filters.max_snv_sb),
        ];
        for (name, value) in fractions {
            if let Some(value) = value {
                if !value.is_finite() || value < 0.0 {
                    return Err(ConfigError::InvalidThreshold { name, value });
                }
            }
        }
        if let Some(value) = self.filters.max_base_filt {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidThreshold {
                    name: "max_base_filt",
                    value,
                });
            }
        }
        for (name, value) in [
            ("snp_theta", self.genotype.snp_theta),
            ("indel_theta", self.genotype.indel_theta),
        ] {
            if !(value > 0.0 && value < 0.5) {
                return Err(ConfigError::InvalidThreshold { name, value });
            }
        }
        Ok(())
    }

    /// Set phasing on or off.
    pub fn with_phasing(mut self, enabled: bool) -> Self {
        self.phasing.enabled = enabled;
        self
    }

    /// Set the phasing window.
    pub fn with_phasing_window(mut self, window: u32) -> Self {
        self.phasing.window = window;
        self
    }

    /// Replace the default filter thresholds.
    pub fn with_filters(mut self, filters: FilterOptions) -> Self {
        self.filters = filters;
        self
    }

    /// Replace the scoring settings.
    pub fn with_scoring(mut self, scoring: ScoringOptions) -> Self {
        self.scoring = scoring;
        self
    }

    /// Set the chromosome depth table file.
    pub fn with_chrom_depth_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.chrom_depth_file = Some(path.into());
        self
    }

    /// Load the chromosome depth table, if one is configured.
    pub fn load_chrom_depths(&self) -> Result<Option<ChromDepthTable>, ConfigError> {
        self.chrom_depth_file
            .as_deref()
            .map(ChromDepthTable::from_path)
            .transpose()
    }
}

/// Expected depth per contig.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChromDepthTable {
    depths: HashMap<String, f64>,
}

impl ChromDepthTable {
    /// Parse `chrom<TAB>depth` lines; blank lines and `#` comments are skipped.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, ConfigError> {
        let mut depths = HashMap::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line.map_err(|source| ConfigError::Io {
                path: PathBuf::from("<chrom depth table>"),
                source,
            })?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let malformed = || ConfigError::MalformedDepthLine {
                line_number: index + 1,
                line: line.clone(),
            };
            let mut fields = trimmed.split('\t');
            let (Some(chrom), Some(depth), None) = (fields.next(), fields.next(), fields.next()) else {
                return Err(malformed());
            };
            let depth: f64 = depth.trim().parse().map_err(|_| malformed())?;
            if !depth.is_finite() || depth < 0.0 {
                return Err(malformed());
            }
            depths.insert(chrom.to_string(), depth);
        }
        Ok(Self { depths })
    }

    /// Read the table from a file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(BufReader::new(file))
    }

    /// Expected depth of `chrom`.
    pub fn get(&self, chrom: &str) -> Option<f64> {
        self.depths.get(chrom).copied()
    }

    /// Number of contigs listed.
    pub fn len(&self) -> usize {
        self.depths.len()
    }

    /// Whether no contig is listed.
    pub fn is_empty(&self) -> bool {
        self.depths.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for ChromDepthTable {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self {
            depths: iter.into_iter().map(|(chrom, depth)| (chrom.into(), depth)).collect(),
        }
    }
}

/// Values derived from the configuration for one contig.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DerivedOptions {
    /// Depth above which `HighDepth` is set.
    pub max_depth: Option<f64>,
    /// Expected depth used to normalise depth features.
    pub norm_depth: Option<f64>,
}

impl DerivedOptions {
    /// Derive options for `chrom`.
    ///
    /// Whenever a depth table is given the contig must be listed, even with
    /// no depth factor; `max_depth` is set only when a factor is configured.
    pub fn for_contig(
        filters: &FilterOptions,
        depths: Option<&ChromDepthTable>,
        chrom: &str,
    ) -> Result<Self, ConfigError> {
        let Some(table) = depths else {
            return Ok(Self::default());
        };
        let depth = table.get(chrom).ok_or_else(|| ConfigError::MissingChromDepth {
            chrom: chrom.to_string(),
        })?;
        let max_depth = filters.max_depth_factor.map(|factor| depth * factor);
        debug!(chrom, depth, ?max_depth, "derived contig options");
        Ok(Self {
            max_depth,
            norm_depth: Some(depth),
        })
    }

    /// Whether the depth filter is active.
    pub fn is_max_depth(&self) -> bool {
        self.max_depth.is_some()
    }
}
