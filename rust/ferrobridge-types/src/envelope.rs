use smallvec::SmallVec;

use crate::fixed_string::FixedString;
use crate::sample::Sample;

/// Inline up to 64 bytes; topics longer than that are interned by the bus's
/// topic registry instead of carried inline on every envelope.
pub type TopicString = FixedString<64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Priority {
    Low,
    Normal,
    High,
    Realtime,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EnvelopeKind {
    Point,
    Batch,
    Control,
    Heartbeat,
    DeadlineTask,
}

/// Either a single `Sample` or a small inline batch. `SmallVec<[Sample; 8]>`
/// keeps the common batch sizes off the heap while still allowing overflow.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Payload {
    Point(Sample),
    Batch(SmallVec<[Sample; 8]>),
}

impl Payload {
    pub fn len(&self) -> usize {
        match self {
            Payload::Point(_) => 1,
            Payload::Batch(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn samples(&self) -> SampleIter<'_> {
        match self {
            Payload::Point(s) => SampleIter::One(Some(s)),
            Payload::Batch(v) => SampleIter::Many(v.iter()),
        }
    }
}

pub enum SampleIter<'a> {
    One(Option<&'a Sample>),
    Many(std::slice::Iter<'a, Sample>),
}

impl<'a> Iterator for SampleIter<'a> {
    type Item = &'a Sample;
    fn next(&mut self) -> Option<Self::Item> {
        match self {
            SampleIter::One(opt) => opt.take(),
            SampleIter::Many(it) => it.next(),
        }
    }
}

/// The unit that moves through the bus, rule engine, and scheduler.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Envelope {
    pub topic: TopicString,
    pub priority: Priority,
    pub sequence: u64,
    pub deadline_ns: Option<u64>,
    pub kind: EnvelopeKind,
    pub payload: Payload,
}

impl Envelope {
    pub fn point(topic: &str, sequence: u64, sample: Sample) -> Self {
        Self {
            topic: TopicString::from_str_truncating(topic),
            priority: Priority::Normal,
            sequence,
            deadline_ns: None,
            kind: EnvelopeKind::Point,
            payload: Payload::Point(sample),
        }
    }

    pub fn batch(topic: &str, sequence: u64, samples: SmallVec<[Sample; 8]>) -> Self {
        Self {
            topic: TopicString::from_str_truncating(topic),
            priority: Priority::Normal,
            sequence,
            deadline_ns: None,
            kind: EnvelopeKind::Batch,
            payload: Payload::Batch(samples),
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_deadline(mut self, deadline_ns: u64) -> Self {
        self.deadline_ns = Some(deadline_ns);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::{Quality, SampleValue};

    #[test]
    fn point_envelope_iterates_one_sample() {
        let s = Sample::new("a", 1, SampleValue::Bool(true), Quality::Good, 0);
        let env = Envelope::point("topic/a", 1, s);
        assert_eq!(env.payload.samples().count(), 1);
    }

    #[test]
    fn batch_envelope_iterates_all_samples() {
        let s = Sample::new("a", 1, SampleValue::Bool(true), Quality::Good, 0);
        let mut v = SmallVec::new();
        v.push(s);
        v.push(s);
        v.push(s);
        let env = Envelope::batch("topic/a", 1, v);
        assert_eq!(env.payload.samples().count(), 3);
    }

    #[test]
    fn priority_ordering_places_realtime_highest() {
        assert!(Priority::Realtime > Priority::High);
        assert!(Priority::High > Priority::Normal);
        assert!(Priority::Normal > Priority::Low);
    }
}
