// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::model::SortDirection;

/// Field selectors a list screen plugs into the shared pipeline.
pub trait ListRecord {
    type SortKey: Copy + Eq;

    fn record_id(&self) -> i64;
    /// Value of the discriminant field the multi-select filter operates on.
    fn discriminant(&self) -> &str;
    /// Fields the search box matches against, OR across the lot.
    fn search_values(&self) -> Vec<&str>;
    /// String-coerced value for a sort key. `None` means the record has no
    /// value there and compares equal to everything.
    fn sort_value(&self, key: Self::SortKey) -> Option<&str>;
    fn deleted(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec<K> {
    pub key: K,
    pub direction: SortDirection,
}

/// One page of derived output: the rows to render plus the counts the
/// paginator needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ListProjection<'a, R> {
    pub rows: Vec<&'a R>,
    pub filtered_count: usize,
    pub page_count: usize,
    pub page: usize,
}

/// Owns one screen's dataset and list controls and derives the visible page
/// through the fixed pipeline: filter, then search, then sort, then
/// paginate. Every operation keeps the current page inside
/// `[1, max(1, page_count)]`; nothing here fails or panics on odd input.
#[derive(Debug, Clone)]
pub struct ListController<R: ListRecord> {
    records: Vec<R>,
    filter: BTreeSet<String>,
    search: String,
    sort: Option<SortSpec<R::SortKey>>,
    page: usize,
    page_size: usize,
    show_deleted: bool,
}

impl<R: ListRecord> ListController<R> {
    pub fn new(page_size: usize) -> Self {
        Self {
            records: Vec::new(),
            filter: BTreeSet::new(),
            search: String::new(),
            sort: None,
            page: 1,
            page_size: page_size.max(1),
            show_deleted: false,
        }
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn filter(&self) -> &BTreeSet<String> {
        &self.filter
    }

    pub fn sort(&self) -> Option<SortSpec<R::SortKey>> {
        self.sort
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn show_deleted(&self) -> bool {
        self.show_deleted
    }

    /// Replaces the dataset wholesale, as happens when a fetch resolves.
    /// Keeps the current page where the new range allows it.
    pub fn replace_records(&mut self, records: Vec<R>) {
        self.records = records;
        self.clamp_page();
    }

    /// Applies an optimistic patch to the single record with `id`. Returns
    /// false when the record is not present.
    pub fn patch_record(&mut self, id: i64, patch: impl FnOnce(&mut R)) -> bool {
        let Some(record) = self
            .records
            .iter_mut()
            .find(|record| record.record_id() == id)
        else {
            return false;
        };
        patch(record);
        self.clamp_page();
        true
    }

    pub fn set_search(&mut self, term: &str) {
        self.search = term.to_owned();
        self.reset_page_if_out_of_range();
    }

    /// Replaces the allowed-value set for the discriminant field. An empty
    /// set turns filtering off.
    pub fn set_filter(&mut self, values: BTreeSet<String>) {
        self.filter = values;
        self.reset_page_if_out_of_range();
    }

    /// Same key toggles the direction; a new key starts ascending. The
    /// filtered count is unchanged either way, so the page stays put.
    pub fn set_sort(&mut self, key: R::SortKey) {
        self.sort = match self.sort {
            Some(current) if current.key == key => Some(SortSpec {
                key,
                direction: current.direction.toggled(),
            }),
            _ => Some(SortSpec {
                key,
                direction: SortDirection::Asc,
            }),
        };
    }

    pub fn clear_sort(&mut self) {
        self.sort = None;
    }

    /// Out-of-range requests are clamped, not rejected.
    pub fn set_page(&mut self, page: usize) {
        self.page = page.clamp(1, self.page_count().max(1));
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        if page_size == 0 {
            return;
        }
        self.page_size = page_size;
        self.clamp_page();
    }

    pub fn set_show_deleted(&mut self, show_deleted: bool) {
        self.show_deleted = show_deleted;
        self.reset_page_if_out_of_range();
    }

    /// Clears search, filter, and sort while keeping the dataset and page
    /// state, as happens on navigation away from a screen.
    pub fn reset_transient(&mut self) {
        self.search.clear();
        self.filter.clear();
        self.sort = None;
    }

    /// Pure derivation of the visible page. Calling this twice with no
    /// intervening mutation yields identical output.
    pub fn project(&self) -> ListProjection<'_, R> {
        let mut rows = self.restricted();
        if let Some(spec) = self.sort {
            sort_rows(&mut rows, spec);
        }

        let filtered_count = rows.len();
        let page_count = if filtered_count == 0 {
            0
        } else {
            filtered_count.div_ceil(self.page_size)
        };
        let start = (self.page - 1) * self.page_size;
        let rows = rows
            .into_iter()
            .skip(start)
            .take(self.page_size)
            .collect::<Vec<&R>>();

        ListProjection {
            rows,
            filtered_count,
            page_count,
            page: self.page,
        }
    }

    /// Pipeline stages one and two: deleted-row cut, discriminant filter,
    /// then substring search. Order within this pair is immaterial (both
    /// are restrictive and commute) but fixed for determinism.
    fn restricted(&self) -> Vec<&R> {
        let mut rows = self
            .records
            .iter()
            .filter(|record| self.show_deleted || !record.deleted())
            .collect::<Vec<&R>>();

        if !self.filter.is_empty() {
            rows.retain(|record| self.filter.contains(record.discriminant()));
        }

        if !self.search.is_empty() {
            let needle = self.search.to_lowercase();
            rows.retain(|record| {
                record
                    .search_values()
                    .iter()
                    .any(|value| value.to_lowercase().contains(&needle))
            });
        }

        rows
    }

    fn page_count(&self) -> usize {
        let count = self.restricted().len();
        if count == 0 {
            0
        } else {
            count.div_ceil(self.page_size)
        }
    }

    fn clamp_page(&mut self) {
        self.page = self.page.clamp(1, self.page_count().max(1));
    }

    fn reset_page_if_out_of_range(&mut self) {
        if self.page > self.page_count().max(1) {
            self.page = 1;
        }
    }
}

/// Stable sort under the missing-compares-equal policy. That policy is not
/// a total order (a missing value is "equal" to two values that differ), and
/// `slice::sort_by` is allowed to panic on such comparators, so the fast
/// path only runs when every row carries a value. Otherwise an insertion
/// walk applies the policy literally: a row moves left only past
/// strictly-greater neighbors and stops at the first pair that compares
/// equal, which means no row ever crosses a missing-valued one.
fn sort_rows<R: ListRecord>(rows: &mut [&R], spec: SortSpec<R::SortKey>) {
    let all_valued = rows
        .iter()
        .all(|record| record.sort_value(spec.key).is_some());
    if all_valued {
        rows.sort_by(|left, right| compare_rows(*left, *right, spec));
        return;
    }

    for sorted_end in 1..rows.len() {
        let mut slot = sorted_end;
        while slot > 0 && compare_rows(rows[slot - 1], rows[slot], spec) == Ordering::Greater {
            rows.swap(slot - 1, slot);
            slot -= 1;
        }
    }
}

fn compare_rows<R: ListRecord>(left: &R, right: &R, spec: SortSpec<R::SortKey>) -> Ordering {
    let ordering = match (left.sort_value(spec.key), right.sort_value(spec.key)) {
        (Some(left_value), Some(right_value)) => left_value
            .to_ascii_lowercase()
            .cmp(&right_value.to_ascii_lowercase()),
        (None, _) | (_, None) => Ordering::Equal,
    };
    match spec.direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}
