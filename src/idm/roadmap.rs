//! 30/60/90-day roadmap generation
//!
//! Recommendations are stably sorted by priority and placed greedily into
//! the earliest open bucket of their placement chain:
//!
//! | priority | timeframe            | chain                |
//! |----------|----------------------|----------------------|
//! | high     | 30-day / unspecified | thirty, sixty, ninety |
//! | high     | 60-day               | sixty, ninety        |
//! | high     | 90-day               | ninety               |
//! | medium   | not 90-day           | sixty, ninety        |
//! | medium   | 90-day               | ninety               |
//! | low      | any                  | ninety               |
//!
//! Medium items never move up into thirty days and low items only ever land
//! in ninety. An item whose whole chain is full is dropped.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{CategoryCode, Priority, Recommendation, Timeframe};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    ThirtyDay,
    SixtyDay,
    NinetyDay,
}

impl Bucket {
    /// Buckets an item may land in, earliest first
    pub fn chain(priority: Priority, timeframe: Timeframe) -> &'static [Bucket] {
        use Bucket::*;
        match (priority, timeframe) {
            (Priority::High, Timeframe::ThirtyDay | Timeframe::Unspecified) => {
                &[ThirtyDay, SixtyDay, NinetyDay]
            }
            (Priority::High, Timeframe::SixtyDay) => &[SixtyDay, NinetyDay],
            (Priority::Medium, Timeframe::NinetyDay) | (Priority::High, Timeframe::NinetyDay) => {
                &[NinetyDay]
            }
            (Priority::Medium, _) => &[SixtyDay, NinetyDay],
            (Priority::Low, _) => &[NinetyDay],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapItem {
    pub action: String,
    pub category: CategoryCode,
    pub impact: String,
}

impl From<&Recommendation> for RoadmapItem {
    fn from(rec: &Recommendation) -> Self {
        Self {
            action: rec.title.clone(),
            category: rec.category,
            impact: rec.estimated_impact.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Roadmap {
    pub thirty_day: Vec<RoadmapItem>,
    pub sixty_day: Vec<RoadmapItem>,
    pub ninety_day: Vec<RoadmapItem>,
}

impl Roadmap {
    pub fn bucket(&self, bucket: Bucket) -> &[RoadmapItem] {
        match bucket {
            Bucket::ThirtyDay => &self.thirty_day,
            Bucket::SixtyDay => &self.sixty_day,
            Bucket::NinetyDay => &self.ninety_day,
        }
    }

    fn bucket_mut(&mut self, bucket: Bucket) -> &mut Vec<RoadmapItem> {
        match bucket {
            Bucket::ThirtyDay => &mut self.thirty_day,
            Bucket::SixtyDay => &mut self.sixty_day,
            Bucket::NinetyDay => &mut self.ninety_day,
        }
    }

    pub fn len(&self) -> usize {
        self.thirty_day.len() + self.sixty_day.len() + self.ninety_day.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct RoadmapBuilder {
    capacity: usize,
}

impl RoadmapBuilder {
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    pub fn build<'a, I>(&self, recommendations: I) -> Roadmap
    where
        I: IntoIterator<Item = &'a Recommendation>,
    {
        let mut sorted: Vec<&Recommendation> = recommendations.into_iter().collect();
        // stable: equal priorities keep input order
        sorted.sort_by_key(|rec| rec.priority);

        let mut roadmap = Roadmap::default();
        let mut dropped = 0usize;

        for rec in sorted {
            let target = Bucket::chain(rec.priority, rec.horizon())
                .iter()
                .copied()
                .find(|bucket| roadmap.bucket(*bucket).len() < self.capacity);
            match target {
                Some(bucket) => roadmap.bucket_mut(bucket).push(RoadmapItem::from(rec)),
                None => dropped += 1,
            }
        }

        debug!(
            thirty = roadmap.thirty_day.len(),
            sixty = roadmap.sixty_day.len(),
            ninety = roadmap.ninety_day.len(),
            dropped,
            "Roadmap built"
        );
        roadmap
    }
}
