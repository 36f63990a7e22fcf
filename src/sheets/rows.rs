// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Spreadsheet rows and their summary statistics.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::SheetError;

/// One table row. Every field is a string; missing cells are `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SheetRow {
    pub id: String,
    pub parent: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub layout: String,
    pub url: String,
    pub country: String,
    pub technology: String,
    pub responsive: String,
    pub description: String,
    pub image: String,
}

impl SheetRow {
    /// Build a row from one spreadsheet record. Column names are matched
    /// case-insensitively.
    pub fn from_record(record: &serde_json::Map<String, Value>) -> Self {
        let cells: HashMap<String, &Value> = record
            .iter()
            .map(|(k, v)| (k.trim().to_ascii_lowercase(), v))
            .collect();
        let cell = |column: &str| cells.get(column).map(|v| cell_text(v)).unwrap_or_default();

        Self {
            id: cell("id"),
            parent: cell("parent"),
            name: cell("name"),
            kind: cell("type"),
            layout: cell("layout"),
            url: cell("url"),
            country: cell("country"),
            technology: cell("technology"),
            responsive: cell("responsive"),
            description: cell("description"),
            image: cell("img"),
        }
    }

    fn is_blank(&self) -> bool {
        self.id.is_empty() && self.name.is_empty()
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Normalize the JSON array returned by the spreadsheet API.
///
/// Non-object entries and rows with neither `id` nor `name` are dropped.
pub fn normalize_rows(raw: &Value) -> Result<Vec<SheetRow>, SheetError> {
    let records = raw
        .as_array()
        .ok_or_else(|| SheetError::InvalidResponse("expected a JSON array of rows".to_string()))?;

    Ok(records
        .iter()
        .filter_map(Value::as_object)
        .map(SheetRow::from_record)
        .filter(|row| !row.is_blank())
        .collect())
}

/// Row counts per value of the columns used for filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SheetStats {
    pub total: usize,
    pub by_type: BTreeMap<String, usize>,
    pub by_layout: BTreeMap<String, usize>,
    pub by_country: BTreeMap<String, usize>,
    pub distinct_types: usize,
    pub distinct_layouts: usize,
    pub distinct_countries: usize,
}

pub fn compute_stats(rows: &[SheetRow]) -> SheetStats {
    fn count<'a>(values: impl Iterator<Item = &'a str>) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for value in values.filter(|v| !v.is_empty()) {
            *counts.entry(value.to_string()).or_insert(0) += 1;
        }
        counts
    }

    let by_type = count(rows.iter().map(|r| r.kind.as_str()));
    let by_layout = count(rows.iter().map(|r| r.layout.as_str()));
    let by_country = count(rows.iter().map(|r| r.country.as_str()));

    SheetStats {
        total: rows.len(),
        distinct_types: by_type.len(),
        distinct_layouts: by_layout.len(),
        distinct_countries: by_country.len(),
        by_type,
        by_layout,
        by_country,
    }
}

/// Built-in dataset served when the spreadsheet is unavailable.
pub fn example_rows() -> Vec<SheetRow> {
    let row = |id: &str, parent: &str, name: &str, kind: &str, layout: &str, url: &str| SheetRow {
        id: id.to_string(),
        parent: parent.to_string(),
        name: name.to_string(),
        kind: kind.to_string(),
        layout: layout.to_string(),
        url: url.to_string(),
        country: "COL".to_string(),
        technology: "React".to_string(),
        responsive: "Yes".to_string(),
        ..SheetRow::default()
    };

    vec![
        SheetRow {
            description: "Main website".to_string(),
            image: "https://alegra.design/monitor/img/section-home.svg".to_string(),
            ..row("WEB", "", "Website", "Group", "", "")
        },
        SheetRow {
            description: "Home page".to_string(),
            ..row("WEB-F0", "WEB", "Inicio", "Section", "Home", "https://www.alegra.com")
        },
        SheetRow {
            description: "Solutions section".to_string(),
            ..row("WEB-F1", "WEB", "Soluciones", "Label", "Detail", "")
        },
    ]
}
