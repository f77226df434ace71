// src/config/seed.rs
//! Static seed data: the terminal tier of the fallback chain.
//!
//! Read-only. Loaded from `$HOTBOARD_SEED_PATH` when set, otherwise from the
//! `config/seed.json` bundled into the binary.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};

use crate::ingest::normalize_text;
use crate::model::Item;

pub const ENV_SEED_PATH: &str = "HOTBOARD_SEED_PATH";

const BUNDLED_SEED: &str = include_str!("../../config/seed.json");

#[derive(Debug, Clone, Default)]
pub struct SeedData {
    categories: HashMap<String, Vec<Item>>,
}

impl SeedData {
    /// Titles are normalized once here; items whose title ends up blank are dropped.
    pub fn new(categories: HashMap<String, Vec<Item>>) -> Self {
        let categories = categories
            .into_iter()
            .map(|(id, items)| {
                let cleaned: Vec<Item> = items
                    .into_iter()
                    .filter_map(|mut it| {
                        it.title = normalize_text(&it.title);
                        (!it.title.is_empty()).then_some(it)
                    })
                    .collect();
                (id, cleaned)
            })
            .collect();
        Self { categories }
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let categories: HashMap<String, Vec<Item>> =
            serde_json::from_str(s).context("parsing seed json")?;
        Ok(Self::new(categories))
    }

    pub fn bundled() -> Result<Self> {
        Self::from_json_str(BUNDLED_SEED)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading seed data from {}", path.display()))?;
        Self::from_json_str(&content)
    }

    pub fn load_default() -> Result<Self> {
        match std::env::var(ENV_SEED_PATH) {
            Ok(p) => {
                let path = Path::new(&p);
                if !path.exists() {
                    return Err(anyhow!("{ENV_SEED_PATH} points to non-existent path"));
                }
                Self::load_from(path)
            }
            Err(_) => Self::bundled(),
        }
    }

    pub fn get(&self, category: &str) -> &[Item] {
        self.categories
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Categories from `required` that have no usable seed items.
    pub fn missing<'a>(&self, required: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
        required
            .into_iter()
            .filter(|c| self.get(c).is_empty())
            .collect()
    }
}
