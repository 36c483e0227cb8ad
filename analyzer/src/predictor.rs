//! Per-sequence orchestration: metrics + topology + classification,
//! assembled into the result stream consumed by reporting.

use tracing::warn;

use crate::config::AnalysisConfig;
use crate::metrics::BiophysicalMetrics;
use crate::models::{
    AnalysisError, AnalysisOutcome, MetricSet, RiskAssessment, SequenceAnalysisResult,
    SequenceRecord, TopologyScore,
};
use crate::risk::RiskClassifier;
use crate::topology::TopologyAnalyzer;

pub struct StructurePredictor {
    metrics: BiophysicalMetrics,
    topology: TopologyAnalyzer,
    classifier: RiskClassifier,
}

impl StructurePredictor {
    /// Configuration errors abort here, before any sequence is touched.
    pub fn new(config: AnalysisConfig) -> Result<Self, AnalysisError> {
        let metrics = BiophysicalMetrics::new(&config);
        let topology = TopologyAnalyzer::new(&config);
        let classifier = RiskClassifier::new(config)?;
        Ok(Self { metrics, topology, classifier })
    }

    pub fn classifier(&self) -> &RiskClassifier {
        &self.classifier
    }

    /// Analyze one record. A validation failure becomes an error-tagged
    /// result instead of propagating: one malformed sequence must not
    /// prevent analysis of the rest of the batch.
    pub fn analyze(&self, record: &SequenceRecord) -> SequenceAnalysisResult {
        let outcome = match self.try_analyze(record) {
            Ok((metrics, topology, risk)) => AnalysisOutcome::Analyzed { metrics, topology, risk },
            Err(e) => {
                warn!("skipping '{}': {e}", record.id);
                AnalysisOutcome::Failed { reason: e.to_string() }
            }
        };
        SequenceAnalysisResult { id: record.id.clone(), length: record.len(), outcome }
    }

    fn try_analyze(
        &self,
        record: &SequenceRecord,
    ) -> Result<(MetricSet, TopologyScore, RiskAssessment), AnalysisError> {
        let metrics = self.metrics.analyze(record)?;
        let topology = self.topology.analyze(record)?;
        let risk = self.classifier.classify(&metrics, &topology);
        Ok((metrics, topology, risk))
    }

    /// Lazy result stream: one result per input record, in input order,
    /// single pass.
    pub fn analyze_all<'a>(
        &'a self,
        records: &'a [SequenceRecord],
    ) -> impl Iterator<Item = SequenceAnalysisResult> + 'a {
        records.iter().map(move |record| self.analyze(record))
    }
}
