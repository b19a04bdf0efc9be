//! Load-once, query-many state shared by every request handler.

use crate::config::FailsightConfig;
use crate::dataset::SensorTable;
use crate::document::Document;
use crate::error::Result;
use crate::fingerprint::SourceFingerprint;
use crate::models::{DeepDive, NarrativeRecord, ReportEntry, SensorSeries};
use crate::narrative::{NarrativeExtractor, Narratives};

/// Narratives and sensor table, loaded eagerly and never mutated.
#[derive(Debug, Clone)]
pub struct DashboardContext {
    work_order_ids: Vec<String>,
    narratives: Narratives,
    table: SensorTable,
    document_fingerprint: SourceFingerprint,
}

impl DashboardContext {
    /// Read both sources named by `config`. Any failure is fatal for the session.
    pub fn load(config: &FailsightConfig) -> Result<Self> {
        let document = Document::open(&config.sources.document_path())?;
        let table = SensorTable::load(&config.sources.dataset_path(), &config.dataset)?;
        if document.is_empty() {
            tracing::warn!("Document {} has no paragraphs", document.fingerprint().path);
        }
        if table.is_empty() {
            tracing::warn!("Dataset {} has no rows", table.fingerprint().path);
        }
        let context = Self::from_parts(config.sources.work_order_ids.clone(), &document, table);
        tracing::info!(
            "Dashboard ready: {} of {} work orders have narratives, {} sensor readings",
            context.narratives.len(),
            context.work_order_ids.len(),
            context.table.len()
        );
        Ok(context)
    }

    pub fn from_parts(work_order_ids: Vec<String>, document: &Document, table: SensorTable) -> Self {
        let extractor = NarrativeExtractor::new(work_order_ids.iter().map(String::as_str));
        let narratives = extractor.extract(document.paragraphs());
        Self {
            work_order_ids,
            narratives,
            table,
            document_fingerprint: document.fingerprint().clone(),
        }
    }

    pub fn get_narrative(&self, identifier: &str) -> Option<&str> {
        self.narratives.get(identifier)
    }

    pub fn get_sensor_series(&self, identifier: &str) -> Vec<SensorSeries> {
        self.table.series(identifier).collect()
    }

    /// The failure prediction report, one entry per configured work order.
    pub fn report(&self) -> Vec<ReportEntry> {
        self.work_order_ids
            .iter()
            .map(|id| ReportEntry::new(id.as_str(), self.get_narrative(id)))
            .collect()
    }

    pub fn deep_dives(&self) -> Vec<DeepDive> {
        self.work_order_ids
            .iter()
            .map(|id| DeepDive::new(id.as_str(), self.get_sensor_series(id)))
            .collect()
    }

    pub fn narrative_records(&self) -> Vec<NarrativeRecord> {
        self.narratives.records().collect()
    }

    pub fn work_order_ids(&self) -> &[String] {
        &self.work_order_ids
    }

    pub fn narrative_count(&self) -> usize {
        self.narratives.len()
    }

    pub fn reading_count(&self) -> usize {
        self.table.len()
    }

    pub fn fingerprints(&self) -> [&SourceFingerprint; 2] {
        [&self.document_fingerprint, self.table.fingerprint()]
    }
}
