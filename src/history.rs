use crate::types::{DetectionSet, EncodedImage};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::SystemTime;
use uuid::Uuid;

/// One completed detection run. Immutable after creation; removed only by a
/// bulk `SessionHistory::clear`.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    id: Uuid,
    plates: DetectionSet,
    timestamp: SystemTime,
    image: Arc<EncodedImage>,
}

impl HistoryEntry {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn plates(&self) -> &DetectionSet {
        &self.plates
    }

    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    pub fn image(&self) -> &Arc<EncodedImage> {
        &self.image
    }

    /// True iff any contained detection is high confidence.
    pub fn has_high_confidence(&self) -> bool {
        self.plates.has_high_confidence()
    }
}

/// Insertion-ordered record of this session's scans, most recent first. The
/// ordering is structural (new entries are pushed to the front), never the
/// result of sorting on read.
#[derive(Debug, Default)]
pub struct SessionHistory {
    entries: VecDeque<HistoryEntry>,
}

impl SessionHistory {
    pub fn new() -> SessionHistory {
        SessionHistory::default()
    }

    pub fn commit(&mut self, plates: DetectionSet, image: Arc<EncodedImage>) -> &HistoryEntry {
        self.entries.push_front(HistoryEntry {
            id: Uuid::new_v4(),
            plates,
            timestamp: SystemTime::now(),
            image,
        });
        &self.entries[0]
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Current size; this is the session scan count.
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries most recent first.
    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn get(&self, index: usize) -> Option<&HistoryEntry> {
        self.entries.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoundingBox, Confidence, PlateDetection};

    fn image() -> Arc<EncodedImage> {
        Arc::new(EncodedImage::new(vec![1, 2, 3], "image/jpeg"))
    }

    fn plate(number: &str, confidence: Confidence) -> PlateDetection {
        PlateDetection {
            plate_number: number.to_string(),
            confidence,
            bounding_box: BoundingBox::new(0.0, 0.0, 100.0, 100.0).unwrap(),
            vehicle_type: None,
            vehicle_model: None,
            color: None,
            region: None,
            owner_name: None,
            registration_date: None,
        }
    }

    fn set_of(plates: Vec<PlateDetection>) -> DetectionSet {
        DetectionSet { plates }
    }

    #[test]
    fn commit_prepends_most_recent_first() {
        let mut history = SessionHistory::new();
        let e1 = history.commit(set_of(vec![plate("AAA", Confidence::Low)]), image()).id();
        let e2 = history.commit(set_of(vec![plate("BBB", Confidence::Low)]), image()).id();
        assert_eq!(history.count(), 2);
        assert_eq!(history.get(0).unwrap().id(), e2);
        assert_eq!(history.get(1).unwrap().id(), e1);
    }

    #[test]
    fn entries_get_distinct_ids() {
        let mut history = SessionHistory::new();
        let a = history.commit(DetectionSet::default(), image()).id();
        let b = history.commit(DetectionSet::default(), image()).id();
        assert_ne!(a, b);
    }

    #[test]
    fn clear_always_empties() {
        let mut history = SessionHistory::new();
        assert_eq!(history.count(), 0);
        history.clear();
        assert_eq!(history.count(), 0);
        for _ in 0..5 {
            history.commit(DetectionSet::default(), image());
        }
        history.clear();
        assert_eq!(history.count(), 0);
        assert!(history.is_empty());
    }

    #[test]
    fn high_confidence_indicator_is_derived() {
        let mut history = SessionHistory::new();
        history.commit(
            set_of(vec![plate("AAA", Confidence::Low), plate("BBB", Confidence::High)]),
            image(),
        );
        history.commit(set_of(vec![plate("CCC", Confidence::Medium)]), image());
        assert!(!history.get(0).unwrap().has_high_confidence());
        assert!(history.get(1).unwrap().has_high_confidence());
        assert!(!SessionHistory::new()
            .commit(DetectionSet::default(), image())
            .has_high_confidence());
    }
}
