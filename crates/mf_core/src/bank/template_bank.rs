//! Ordered collection of templates loaded from disk.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use super::error::{BankError, BankResult};
use super::template::{Template, TEMPLATE_EXTENSION};

/// Templates in load order. Names are unique within a bank and each source
/// file is loaded at most once.
#[derive(Debug, Default, Clone)]
pub struct TemplateBank {
    templates: Vec<Template>,
    sources: Vec<PathBuf>,
    seen: HashSet<PathBuf>,
}

impl TemplateBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every file or directory in `paths`, in order.
    pub fn from_paths<P: AsRef<Path>>(paths: &[P]) -> BankResult<Self> {
        let mut bank = Self::new();
        for path in paths {
            let path = path.as_ref();
            if path.is_dir() {
                bank.add_directory(path)?;
            } else if path.is_file() {
                bank.add_template(path)?;
            } else {
                return Err(BankError::NotFound(path.to_path_buf()));
            }
        }
        Ok(bank)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Template> {
        self.templates.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Template> {
        self.templates.get(index)
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn names(&self) -> Vec<&str> {
        self.templates.iter().map(|t| t.name.as_str()).collect()
    }

    /// Files the bank was loaded from.
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    /// Load one `.tpl` file. Returns `false` if it was already loaded.
    pub fn add_template(&mut self, path: &Path) -> BankResult<bool> {
        let key = fs::canonicalize(path).map_err(|e| BankError::io(path, e))?;
        if self.seen.contains(&key) {
            tracing::debug!("Skipping already loaded template {}", path.display());
            return Ok(false);
        }
        let template = Template::load(path)?;
        self.seen.insert(key);
        self.sources.push(path.to_path_buf());
        self.push(template);
        Ok(true)
    }

    /// Load all `.tpl` files in a directory, sorted by file name. Returns how
    /// many were newly added.
    pub fn add_directory(&mut self, dir: &Path) -> BankResult<usize> {
        if !dir.is_dir() {
            return Err(BankError::NotFound(dir.to_path_buf()));
        }
        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .map_err(|e| BankError::io(dir, e))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == TEMPLATE_EXTENSION))
            .collect();
        files.sort();

        let mut added = 0;
        for file in files {
            if self.add_template(&file)? {
                added += 1;
            }
        }
        tracing::info!("Loaded {} templates from {}", added, dir.display());
        Ok(added)
    }

    /// Append a template, renaming it if the name is taken.
    pub fn push(&mut self, mut template: Template) -> &Template {
        let name = self.unique_name(&template.name);
        if name != template.name {
            tracing::debug!("Renamed template {} to {}", template.name, name);
            template.name = name;
        }
        self.templates.push(template);
        let last = self.templates.len() - 1;
        &self.templates[last]
    }

    /// `base` if free, otherwise the first free `base_2`, `base_3`, ...
    pub fn unique_name(&self, base: &str) -> String {
        let taken = |name: &str| self.templates.iter().any(|t| t.name == name);
        if !taken(base) {
            return base.to_string();
        }
        (2..)
            .map(|n| format!("{base}_{n}"))
            .find(|candidate| !taken(candidate))
            .unwrap_or_else(|| base.to_string())
    }
}

impl<'a> IntoIterator for &'a TemplateBank {
    type Item = &'a Template;
    type IntoIter = std::slice::Iter<'a, Template>;

    fn into_iter(self) -> Self::IntoIter {
        self.templates.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MassPair;
    use tempfile::tempdir;

    fn template(name: &str, m1: f64) -> Template {
        let buffer: Vec<f64> = (0..64).map(|i| (i as f64 * 0.3).sin()).collect();
        Template::from_time_domain(name, MassPair::new(m1, 5.0), "TaylorT3", 64, 60, &buffer)
    }

    #[test]
    fn duplicate_names_get_suffixes() {
        let mut bank = TemplateBank::new();
        bank.push(template("a", 10.0));
        bank.push(template("a", 11.0));
        bank.push(template("a", 12.0));
        assert_eq!(bank.names(), vec!["a", "a_2", "a_3"]);
        assert_eq!(bank.unique_name("b"), "b");
    }

    #[test]
    fn directory_loads_sorted_and_skips_reloads() {
        let dir = tempdir().unwrap();
        template("b", 10.0).save(&dir.path().join("b.tpl")).unwrap();
        template("a", 11.0).save(&dir.path().join("a.tpl")).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut bank = TemplateBank::new();
        assert_eq!(bank.add_directory(dir.path()).unwrap(), 2);
        assert_eq!(bank.names(), vec!["a", "b"]);

        assert!(!bank.add_template(&dir.path().join("a.tpl")).unwrap());
        assert_eq!(bank.len(), 2);
        assert_eq!(bank.sources().len(), 2);
    }

    #[test]
    fn from_paths_reports_missing_path() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            TemplateBank::from_paths(&[missing]),
            Err(BankError::NotFound(_))
        ));
    }
}
