//! A single matched-filter template and its on-disk format.
//!
//! Templates are stored as `<name>.tpl`, a JSON document holding the masses,
//! the approximant, the sampling geometry and the one-sided spectrum. A
//! time-domain copy can be exported as 32-bit float mono WAV.

use std::fs;
use std::path::Path;

use rustfft::num_complex::Complex;
use serde::{Deserialize, Serialize};

use crate::analysis::geometry::offset_seconds;
use crate::analysis::spectrum::{one_sided_spectrum, real_from_spectrum, sigma};
use crate::models::MassPair;

use super::error::{BankError, BankResult};

/// File extension of stored templates.
pub const TEMPLATE_EXTENSION: &str = "tpl";

const FORMAT_VERSION: u32 = 1;

/// A named reference waveform in the frequency domain. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub name: String,
    pub masses: MassPair,
    /// Approximant that produced the waveform.
    pub approximant: String,
    pub sample_rate: u32,
    event_index: usize,
    buffer_len: usize,
    spectrum: Vec<Complex<f64>>,
    sigma: f64,
}

impl Template {
    /// Build from a one-sided spectrum of a `buffer_len` sample buffer.
    pub fn new(
        name: impl Into<String>,
        masses: MassPair,
        approximant: impl Into<String>,
        sample_rate: u32,
        event_index: usize,
        buffer_len: usize,
        spectrum: Vec<Complex<f64>>,
    ) -> Self {
        let sigma = sigma(&spectrum, buffer_len);
        Self {
            name: name.into(),
            masses,
            approximant: approximant.into(),
            sample_rate,
            event_index,
            buffer_len,
            spectrum,
            sigma,
        }
    }

    /// Build from a time-domain buffer.
    pub fn from_time_domain(
        name: impl Into<String>,
        masses: MassPair,
        approximant: impl Into<String>,
        sample_rate: u32,
        event_index: usize,
        buffer: &[f64],
    ) -> Self {
        Self::new(
            name,
            masses,
            approximant,
            sample_rate,
            event_index,
            buffer.len(),
            one_sided_spectrum(buffer),
        )
    }

    pub fn spectrum(&self) -> &[Complex<f64>] {
        &self.spectrum
    }

    /// Filter normalization of the template.
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Length of the template buffer in samples.
    pub fn buffer_len(&self) -> usize {
        self.buffer_len
    }

    pub fn event_index(&self) -> usize {
        self.event_index
    }

    /// Seconds between the event and the end of the buffer.
    pub fn offset_seconds(&self) -> f64 {
        offset_seconds(self.event_index, self.buffer_len, self.sample_rate)
    }

    /// Reconstruct the time-domain buffer.
    pub fn time_domain(&self) -> Vec<f64> {
        real_from_spectrum(&self.spectrum, self.buffer_len)
    }

    /// Read a `.tpl` file. The template takes the file stem as its name.
    pub fn load(path: &Path) -> BankResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| BankError::io(path, e))?;
        let file: TemplateFile =
            serde_json::from_str(&content).map_err(|e| BankError::parse(path, e.to_string()))?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.name.clone());
        file.into_template(name)
            .map_err(|message| BankError::invalid(path, message))
    }

    /// Write a `.tpl` file atomically. An existing file is never replaced.
    pub fn save(&self, path: &Path) -> BankResult<()> {
        if path.exists() {
            return Err(BankError::AlreadyExists(path.to_path_buf()));
        }
        let json = serde_json::to_string(&TemplateFile::from(self))
            .map_err(|e| BankError::parse(path, e.to_string()))?;
        atomic_write(path, json.as_bytes())
    }

    /// Export the time-domain buffer as 32-bit float mono WAV.
    pub fn export_wav(&self, path: &Path) -> BankResult<()> {
        if path.exists() {
            return Err(BankError::AlreadyExists(path.to_path_buf()));
        }
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let temp = path.with_extension("wav.tmp");
        let mut writer = hound::WavWriter::create(&temp, spec)?;
        for sample in self.time_domain() {
            writer.write_sample(sample as f32)?;
        }
        writer.finalize()?;
        fs::rename(&temp, path).map_err(|e| BankError::io(path, e))
    }
}

/// Write through a temp file in the same directory, then rename.
fn atomic_write(path: &Path, bytes: &[u8]) -> BankResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| BankError::io(parent, e))?;
    }
    let mut temp = path.as_os_str().to_owned();
    temp.push(".tmp");
    let temp = std::path::PathBuf::from(temp);
    fs::write(&temp, bytes).map_err(|e| BankError::io(&temp, e))?;
    fs::rename(&temp, path).map_err(|e| BankError::io(path, e))
}

/// Serialized form of a template.
#[derive(Debug, Serialize, Deserialize)]
struct TemplateFile {
    version: u32,
    name: String,
    m1: f64,
    m2: f64,
    approximant: String,
    sample_rate: u32,
    event_index: usize,
    buffer_len: usize,
    spectrum_re: Vec<f64>,
    spectrum_im: Vec<f64>,
}

impl From<&Template> for TemplateFile {
    fn from(t: &Template) -> Self {
        Self {
            version: FORMAT_VERSION,
            name: t.name.clone(),
            m1: t.masses.m1,
            m2: t.masses.m2,
            approximant: t.approximant.clone(),
            sample_rate: t.sample_rate,
            event_index: t.event_index,
            buffer_len: t.buffer_len,
            spectrum_re: t.spectrum.iter().map(|c| c.re).collect(),
            spectrum_im: t.spectrum.iter().map(|c| c.im).collect(),
        }
    }
}

impl TemplateFile {
    fn into_template(self, name: String) -> Result<Template, String> {
        if self.version != FORMAT_VERSION {
            return Err(format!("unsupported template version {}", self.version));
        }
        if self.spectrum_re.len() != self.spectrum_im.len() {
            return Err("spectrum parts differ in length".into());
        }
        if self.spectrum_re.len() != self.buffer_len / 2 + 1 {
            return Err(format!(
                "spectrum has {} bins, expected {} for {} samples",
                self.spectrum_re.len(),
                self.buffer_len / 2 + 1,
                self.buffer_len
            ));
        }
        if self.event_index >= self.buffer_len || self.sample_rate == 0 {
            return Err("event index or sample rate out of range".into());
        }
        let spectrum = self
            .spectrum_re
            .into_iter()
            .zip(self.spectrum_im)
            .map(|(re, im)| Complex::new(re, im))
            .collect();
        Ok(Template::new(
            name,
            MassPair::new(self.m1, self.m2),
            self.approximant,
            self.sample_rate,
            self.event_index,
            self.buffer_len,
            spectrum,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_template(name: &str) -> Template {
        let mut buffer = vec![0.0; 256];
        for (i, v) in buffer.iter_mut().enumerate().skip(128).take(120) {
            *v = (i as f64 * 0.4).sin();
        }
        Template::from_time_domain(name, MassPair::new(12.0, 8.0), "TaylorT3", 256, 247, &buffer)
    }

    #[test]
    fn save_and_load_keep_masses_and_spectrum() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bank_mm_12-8.tpl");
        let template = sample_template("bank_mm_12-8");

        template.save(&path).unwrap();
        let loaded = Template::load(&path).unwrap();

        assert_eq!(loaded.name, "bank_mm_12-8");
        assert_eq!(loaded.masses, template.masses);
        assert_eq!(loaded.approximant, "TaylorT3");
        assert_eq!(loaded.buffer_len(), 256);
        assert!((loaded.sigma() - template.sigma()).abs() < 1e-12);
        assert!((loaded.offset_seconds() - 9.0 / 256.0).abs() < 1e-12);
    }

    #[test]
    fn save_refuses_to_overwrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.tpl");
        sample_template("a").save(&path).unwrap();
        assert!(matches!(
            sample_template("a").save(&path),
            Err(BankError::AlreadyExists(_))
        ));
        assert!(!dir.path().join("a.tpl.tmp").exists());
    }

    #[test]
    fn time_domain_round_trips_through_spectrum() {
        let template = sample_template("t");
        let td = template.time_domain();
        assert_eq!(td.len(), 256);
        assert!(td[..128].iter().all(|x| x.abs() < 1e-9));
        assert!((td[130] - (130.0f64 * 0.4).sin()).abs() < 1e-9);
    }

    #[test]
    fn load_rejects_inconsistent_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.tpl");
        fs::write(
            &path,
            r#"{"version":1,"name":"bad","m1":1,"m2":1,"approximant":"x","sample_rate":4,
                "event_index":1,"buffer_len":4,"spectrum_re":[0,0],"spectrum_im":[0,0]}"#,
        )
        .unwrap();
        assert!(matches!(Template::load(&path), Err(BankError::Invalid { .. })));
    }

    #[test]
    fn exports_float_wav() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.wav");
        sample_template("t").export_wav(&path).unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_format, hound::SampleFormat::Float);
        assert_eq!(reader.len(), 256);
    }
}
