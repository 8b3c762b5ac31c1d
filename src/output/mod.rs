pub mod writer;

use serde::Serialize;

pub use writer::PageWriter;

/// Position of one output page within its resource's page sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaginationEnvelope {
    pub current_page: usize,
    pub total_pages: usize,
    pub items_per_page: usize,
    pub total_items: usize,
    pub items_in_page: usize,
    pub has_next_page: bool,
    pub has_previous_page: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_page_file: Option<String>,
}

#[derive(Debug)]
pub struct OutputPage<'a, T> {
    pub file_name: String,
    pub records: &'a [T],
    pub pagination: PaginationEnvelope,
}

/// `<base>.json` for the first page, `<base>_page<N>.json` after it.
pub fn page_file_name(base_name: &str, page_index: usize) -> String {
    if page_index == 0 {
        format!("{}.json", base_name)
    } else {
        format!("{}_page{}.json", base_name, page_index + 1)
    }
}

/// Split `records` into pages of `page_size`, in input order. An empty
/// input still yields one (empty) page so every resource has a file.
pub fn partition<'a, T>(records: &'a [T], page_size: usize, base_name: &str) -> Vec<OutputPage<'a, T>> {
    let page_size = page_size.max(1);
    let total_items = records.len();

    if total_items == 0 {
        return vec![OutputPage {
            file_name: page_file_name(base_name, 0),
            records,
            pagination: PaginationEnvelope {
                current_page: 1,
                total_pages: 0,
                items_per_page: page_size,
                total_items: 0,
                items_in_page: 0,
                has_next_page: false,
                has_previous_page: false,
                next_page_file: None,
                previous_page_file: None,
            },
        }];
    }

    let total_pages = total_items.div_ceil(page_size);
    records
        .chunks(page_size)
        .enumerate()
        .map(|(i, chunk)| {
            let has_next_page = i + 1 < total_pages;
            let has_previous_page = i > 0;
            OutputPage {
                file_name: page_file_name(base_name, i),
                records: chunk,
                pagination: PaginationEnvelope {
                    current_page: i + 1,
                    total_pages,
                    items_per_page: page_size,
                    total_items,
                    items_in_page: chunk.len(),
                    has_next_page,
                    has_previous_page,
                    next_page_file: has_next_page.then(|| page_file_name(base_name, i + 1)),
                    previous_page_file: has_previous_page.then(|| page_file_name(base_name, i - 1)),
                },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_630_into_three() {
        let records: Vec<u32> = (0..630).collect();
        let pages = partition(&records, 250, "x");
        let sizes: Vec<usize> = pages.iter().map(|p| p.records.len()).collect();
        assert_eq!(sizes, vec![250, 250, 130]);

        let names: Vec<&str> = pages.iter().map(|p| p.file_name.as_str()).collect();
        assert_eq!(names, vec!["x.json", "x_page2.json", "x_page3.json"]);

        let last = &pages[2].pagination;
        assert!(!last.has_next_page);
        assert!(last.has_previous_page);
        assert_eq!(last.items_in_page, 130);
        assert_eq!(last.total_pages, 3);
        assert_eq!(last.previous_page_file.as_deref(), Some("x_page2.json"));
        assert_eq!(last.next_page_file, None);

        let concat: Vec<u32> = pages.iter().flat_map(|p| p.records.iter().copied()).collect();
        assert_eq!(concat, records);
    }

    #[test]
    fn second_page_links_to_bare_base() {
        let records: Vec<u32> = (0..6).collect();
        let pages = partition(&records, 3, "products");
        assert_eq!(pages[0].pagination.next_page_file.as_deref(), Some("products_page2.json"));
        assert_eq!(pages[0].pagination.previous_page_file, None);
        assert_eq!(pages[1].pagination.previous_page_file.as_deref(), Some("products.json"));
        assert_eq!(pages.iter().filter(|p| !p.pagination.has_next_page).count(), 1);
        assert_eq!(pages.iter().filter(|p| !p.pagination.has_previous_page).count(), 1);
    }

    #[test]
    fn empty_input_yields_one_empty_page() {
        let records: Vec<u32> = Vec::new();
        let pages = partition(&records, 250, "x");
        assert_eq!(pages.len(), 1);
        let p = &pages[0].pagination;
        assert_eq!(pages[0].file_name, "x.json");
        assert_eq!(p.items_in_page, 0);
        assert_eq!(p.total_pages, 0);
        assert_eq!(p.current_page, 1);
        assert!(!p.has_next_page && !p.has_previous_page);
    }

    #[test]
    fn exact_multiple_has_no_padding_page() {
        let records: Vec<u32> = (0..500).collect();
        let pages = partition(&records, 250, "x");
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].pagination.items_in_page, 250);
    }

    #[test]
    fn absent_links_are_omitted() {
        let records = vec![1u32];
        let pages = partition(&records, 250, "blogs");
        let json = serde_json::to_value(&pages[0].pagination).unwrap();
        assert!(json.get("next_page_file").is_none());
        assert!(json.get("previous_page_file").is_none());
        assert_eq!(json["total_pages"], 1);
    }
}
