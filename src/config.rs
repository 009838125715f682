use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::ScoringScheme;
use crate::scoring::rank::DEFAULT_TOP_N;

/// Root configuration structure, deserialized from `.scc-risk/config.toml`.
///
/// Every section is optional; missing sections fall back to the built-in
/// engineering defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scoring: ScoringConfig,
    pub thresholds: Thresholds,
    pub weights: Weights,
    pub fixed_point: FixedPointRules,
    pub normalization: NormalizationConfig,
    pub data: DataConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// The one scheme used for every station in a run.
    pub scheme: ScoringScheme,
    /// Maximum length of the ranked list.
    pub top_n: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig {
            scheme: ScoringScheme::Weighted,
            top_n: DEFAULT_TOP_N,
        }
    }
}

/// Thresholds for the seven risk criteria.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Stress flag when hoop stress is strictly above this (% SMYS).
    pub hoop_stress_pct: f64,
    /// Soil flag when resistivity is strictly below this (Ω·cm).
    pub soil_resistivity_ohm_cm: f64,
    /// Near-pump flag when distance is at most this (km).
    pub near_pump_km: f64,
    /// Age flag when age is at least this (years).
    pub pipe_age_years: f64,
    /// Temperature flag when strictly above this (°C).
    pub temperature_c: f64,
    /// Over-protection when the OFF-PSP magnitude is strictly above this (V).
    pub over_protection_v: f64,
    /// Lower protection criterion (V magnitude); only drawn on charts.
    pub protection_criterion_v: f64,
    /// Coating flag when the normalized coating contains any of these.
    pub coating_keywords: Vec<String>,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            hoop_stress_pct: 60.0,
            soil_resistivity_ohm_cm: 5000.0,
            near_pump_km: 32.0,
            pipe_age_years: 10.0,
            temperature_c: 38.0,
            over_protection_v: 1.2,
            protection_criterion_v: 0.85,
            coating_keywords: vec!["CTE".to_string(), "COAL TAR".to_string()],
        }
    }
}

/// Weights of the composite score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weights {
    pub hoop_stress: f64,
    pub psp: f64,
    pub distance: f64,
    pub soil: f64,
    /// Resistivity at which the soil term reaches zero (Ω·cm).
    pub soil_reference_ohm_cm: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Weights {
            hoop_stress: 0.6,
            psp: 0.3,
            distance: 0.2,
            soil: 0.1,
            soil_reference_ohm_cm: 10_000.0,
        }
    }
}

/// Point awards and bands for [`ScoringScheme::FixedPoint`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixedPointRules {
    pub hoop_stress_pct: f64,
    pub coating_keyword: String,
    pub near_pump_km: f64,
    pub pipe_age_years: f64,
    pub temperature_c: f64,
    pub over_protection_v: f64,
    /// Points for each of the five main criteria.
    pub points: f64,
    /// Points for over-protection.
    pub psp_points: f64,
    /// Lowest score in the Moderate band.
    pub moderate_from: f64,
    /// Lowest score in the High band.
    pub high_from: f64,
}

impl Default for FixedPointRules {
    fn default() -> Self {
        FixedPointRules {
            hoop_stress_pct: 60.0,
            coating_keyword: "PLANT CTE".to_string(),
            near_pump_km: 32.0,
            pipe_age_years: 10.0,
            temperature_c: 38.0,
            over_protection_v: 1.2,
            points: 10.0,
            psp_points: 5.0,
            moderate_from: 20.0,
            high_from: 35.0,
        }
    }
}

/// How hoop-stress values are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HoopStressScale {
    /// Treat the column as fractions when its maximum is below 10.
    #[default]
    Auto,
    /// Values are already percentages of SMYS.
    Percent,
    /// Values are fractions of SMYS and are always multiplied by 100.
    Fraction,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationConfig {
    pub hoop_stress_scale: HoopStressScale,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Path or URL used when no source is given on the command line.
    pub default_source: Option<String>,
    /// Timeout for remote fetches, in seconds.
    pub timeout_secs: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            default_source: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Cache directory [default: `<cache dir>/scc-risk`].
    pub dir: Option<PathBuf>,
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            enabled: true,
            dir: None,
            max_entries: 32,
        }
    }
}

impl Config {
    /// Stable text form of every setting that affects assessment results.
    ///
    /// Data-source and cache settings are excluded: they change where results
    /// come from, not what they are.
    pub fn fingerprint(&self) -> String {
        let relevant = (
            &self.scoring,
            &self.thresholds,
            &self.weights,
            &self.fixed_point,
            &self.normalization,
        );
        serde_json::to_string(&relevant).unwrap_or_default()
    }
}

/// Load the configuration, searching in order:
///
/// 1. `config_override` — path passed via `--config`
/// 2. `./.scc-risk/config.toml`
/// 3. `~/.config/scc-risk/config.toml`
/// 4. Built-in [`Config::default`]
pub fn load_config(working_dir: &Path, config_override: Option<&Path>) -> Result<Config> {
    if let Some(path) = config_override {
        return read_config(path);
    }

    let local = working_dir.join(".scc-risk").join("config.toml");
    if local.exists() {
        return read_config(&local);
    }

    if let Some(home) = dirs::home_dir() {
        let home_config = home.join(".config").join("scc-risk").join("config.toml");
        if home_config.exists() {
            return read_config(&home_config);
        }
    }

    Ok(Config::default())
}

fn read_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Invalid config {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}
