use serde::{Deserialize, Serialize};

/// One page of an offset paginated listing.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PageContext<T> {
    pub rows: Vec<T>,
    pub total_rows: i64,
    pub next_offset: Option<i64>,
    pub prev_offset: Option<i64>,
    pub page_list: Vec<(String, i64)>,
    pub message: Option<String>,
}

/// Page size for a caller supplied `limit`, falling back to `default` when
/// it is missing or not positive.
pub fn page_size(limit: Option<i64>, default: i64) -> i64 {
    limit.filter(|limit| *limit > 0).unwrap_or(default)
}

impl<T> PageContext<T> {
    pub fn from_rows(rows: Vec<T>, total_rows: i64, page_size: i64, current_offset: i64) -> Self {
        if total_rows <= 0 || page_size <= 0 {
            return Self::no_rows();
        }
        let current_offset = current_offset.max(0);
        let page_count = (total_rows + page_size - 1) / page_size;

        if rows.is_empty() {
            return Self::past_end(total_rows, page_size, page_count);
        }

        let next_offset = current_offset + page_size;
        let next_offset = (next_offset < total_rows).then_some(next_offset);
        let prev_offset = (current_offset > 0).then(|| (current_offset - page_size).max(0));

        let current_page = current_offset / page_size;

        let page_list = (0..page_count)
            .map(|n| {
                let page = if n == current_page {
                    String::from("...")
                } else {
                    format!("{}", n + 1)
                };

                (page, n * page_size)
            })
            .collect();

        Self {
            message: Some(format!(
                "{} - {} / {}",
                current_offset + 1,
                (current_offset + rows.len() as i64).min(total_rows),
                total_rows
            )),
            rows,
            total_rows,
            next_offset,
            prev_offset,
            page_list,
        }
    }

    /// An offset beyond the last row still reports the total and points back
    /// to the last page.
    fn past_end(total_rows: i64, page_size: i64, page_count: i64) -> Self {
        Self {
            rows: vec![],
            total_rows,
            next_offset: None,
            prev_offset: Some((page_count - 1) * page_size),
            page_list: (0..page_count)
                .map(|n| (format!("{}", n + 1), n * page_size))
                .collect(),
            message: Some(format!("No results / {total_rows}")),
        }
    }

    pub fn no_rows() -> Self {
        Self {
            rows: vec![],
            total_rows: 0,
            next_offset: None,
            prev_offset: None,
            page_list: vec![(String::from("1"), 0)],
            message: Some(String::from("No results")),
        }
    }

    pub fn map<U, F>(self, f: F) -> PageContext<U>
    where
        F: FnMut(T) -> U,
    {
        PageContext {
            rows: self.rows.into_iter().map(f).collect(),
            total_rows: self.total_rows,
            next_offset: self.next_offset,
            prev_offset: self.prev_offset,
            page_list: self.page_list,
            message: self.message,
        }
    }
}
