use std::collections::HashMap;
use std::hash::Hash;

use chrono::{DateTime, Utc};
use shared::domain::{AssignedCv, Review, Reviewee, ReviewerRecord};

/// Sort direction for a single column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Tri-state sort selection. With no column or no direction the collection
/// renders in arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState<C> {
    pub column: Option<C>,
    pub direction: Option<Direction>,
}

impl<C> Default for SortState<C> {
    fn default() -> Self {
        Self {
            column: None,
            direction: None,
        }
    }
}

impl<C: Copy + PartialEq> SortState<C> {
    /// Advances the cycle for a header click: repeated clicks on one column
    /// walk asc → desc → unsorted → asc; a different column starts at asc.
    pub fn cycle(&mut self, column: C) {
        self.direction = if self.column == Some(column) {
            match self.direction {
                Some(Direction::Asc) => Some(Direction::Desc),
                Some(Direction::Desc) => None,
                None => Some(Direction::Asc),
            }
        } else {
            Some(Direction::Asc)
        };
        self.column = Some(column);
    }

    /// Header marker for rendered tables.
    pub fn indicator(&self, column: C) -> &'static str {
        if self.column != Some(column) {
            return "↕";
        }
        match self.direction {
            Some(Direction::Asc) => "↑",
            Some(Direction::Desc) => "↓",
            None => "↕",
        }
    }
}

/// Value domain sortable columns extract into. Text is lowercased on
/// construction, so text comparisons are case-insensitive by construction.
/// The default (empty text) stands in for missing values and orders before
/// everything else ascending; a given column is expected to extract a single
/// variant across records.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortValue {
    Text(String),
    Number(i64),
    Flag(bool),
}

impl SortValue {
    pub fn text(value: impl AsRef<str>) -> Self {
        Self::Text(value.as_ref().to_lowercase())
    }

    pub fn number(value: i64) -> Self {
        Self::Number(value)
    }

    pub fn flag(value: bool) -> Self {
        Self::Flag(value)
    }

    pub fn time(value: DateTime<Utc>) -> Self {
        Self::Number(value.timestamp_millis())
    }
}

impl Default for SortValue {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

type Extractor<T> = fn(&T) -> SortValue;

/// Reusable multi-column sorter: register one extraction function per column,
/// then order any snapshot of rows against a [`SortState`]. Ordering copies;
/// the source collection is never mutated.
pub struct SortEngine<C, T> {
    columns: HashMap<C, Extractor<T>>,
}

impl<C: Copy + Eq + Hash, T: Clone> SortEngine<C, T> {
    pub fn new() -> Self {
        Self {
            columns: HashMap::new(),
        }
    }

    pub fn column(mut self, column: C, extract: Extractor<T>) -> Self {
        self.columns.insert(column, extract);
        self
    }

    /// Returns the rows reordered per `state`. An unset column or direction,
    /// or a column with no registered extractor, yields the input order. The
    /// underlying sort is stable, so equal keys keep their arrival order in
    /// both directions.
    pub fn order(&self, rows: &[T], state: SortState<C>) -> Vec<T> {
        let mut ordered = rows.to_vec();
        let (Some(column), Some(direction)) = (state.column, state.direction) else {
            return ordered;
        };
        let Some(extract) = self.columns.get(&column) else {
            return ordered;
        };
        ordered.sort_by(|left, right| {
            let ordering = extract(left).cmp(&extract(right));
            match direction {
                Direction::Asc => ordering,
                Direction::Desc => ordering.reverse(),
            }
        });
        ordered
    }
}

impl<C: Copy + Eq + Hash, T: Clone> Default for SortEngine<C, T> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RevieweeColumn {
    Id,
    Name,
    RollNo,
    Profile,
    AssignedTo,
    Status,
}

pub fn reviewee_engine() -> SortEngine<RevieweeColumn, Reviewee> {
    SortEngine::new()
        .column(RevieweeColumn::Id, |reviewee: &Reviewee| {
            SortValue::number(reviewee.id.0)
        })
        .column(RevieweeColumn::Name, |reviewee| {
            SortValue::text(&reviewee.name)
        })
        .column(RevieweeColumn::RollNo, |reviewee| {
            SortValue::text(&reviewee.roll_no)
        })
        .column(RevieweeColumn::Profile, |reviewee| {
            SortValue::text(&reviewee.profile)
        })
        .column(RevieweeColumn::AssignedTo, |reviewee| {
            reviewee
                .assigned_to_id
                .map(|id| SortValue::number(id.0))
                .unwrap_or_default()
        })
        .column(RevieweeColumn::Status, |reviewee| {
            SortValue::flag(reviewee.status)
        })
}

/// Same columns over the personal assigned list, reaching through to the
/// underlying reviewee.
pub fn assigned_engine() -> SortEngine<RevieweeColumn, AssignedCv> {
    SortEngine::new()
        .column(RevieweeColumn::Id, |cv: &AssignedCv| {
            SortValue::number(cv.reviewee.id.0)
        })
        .column(RevieweeColumn::Name, |cv| {
            SortValue::text(&cv.reviewee.name)
        })
        .column(RevieweeColumn::RollNo, |cv| {
            SortValue::text(&cv.reviewee.roll_no)
        })
        .column(RevieweeColumn::Profile, |cv| {
            SortValue::text(&cv.reviewee.profile)
        })
        .column(RevieweeColumn::AssignedTo, |cv| {
            cv.reviewee
                .assigned_to_id
                .map(|id| SortValue::number(id.0))
                .unwrap_or_default()
        })
        .column(RevieweeColumn::Status, |cv| {
            SortValue::flag(cv.reviewee.status)
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReviewerColumn {
    Id,
    Name,
    Password,
    Profiles,
    ReviewedCount,
    AssignedCvs,
}

pub fn reviewer_engine() -> SortEngine<ReviewerColumn, ReviewerRecord> {
    SortEngine::new()
        .column(ReviewerColumn::Id, |record: &ReviewerRecord| {
            SortValue::number(record.id.0)
        })
        .column(ReviewerColumn::Name, |record| SortValue::text(&record.name))
        .column(ReviewerColumn::Password, |record| {
            SortValue::text(&record.password)
        })
        .column(ReviewerColumn::Profiles, |record| {
            SortValue::text(record.profiles.join(", "))
        })
        .column(ReviewerColumn::ReviewedCount, |record| {
            SortValue::number(record.reviewed_count as i64)
        })
        .column(ReviewerColumn::AssignedCvs, |record| {
            SortValue::number(record.assigned_cvs.len() as i64)
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReviewColumn {
    Id,
    Reviewee,
    Reviewer,
    SubmissionTime,
}

pub fn review_engine() -> SortEngine<ReviewColumn, Review> {
    SortEngine::new()
        .column(ReviewColumn::Id, |review: &Review| {
            SortValue::number(review.id.0)
        })
        .column(ReviewColumn::Reviewee, |review| {
            SortValue::text(&review.reviewee.name)
        })
        .column(ReviewColumn::Reviewer, |review| {
            SortValue::text(&review.reviewer.name)
        })
        .column(ReviewColumn::SubmissionTime, |review| {
            SortValue::time(review.submission_time)
        })
}

#[cfg(test)]
#[path = "tests/sorting_tests.rs"]
mod tests;
