//! 목록 화면용 페이지네이션
//!
//! - exact: `COUNT(*)` 로 전체 건수를 구함
//! - fast: `per_page + 1` 행만 읽고 전체 건수를 추정 (대용량 원문 테이블용)

use serde::Serialize;

/// 페이지 요청 (page 는 1부터)
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub page: usize,
    pub per_page: usize,
    pub fast: bool,
}

impl PageRequest {
    pub fn new(page: usize, per_page: usize, fast: bool) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
            fast,
        }
    }

    pub fn offset(&self) -> usize {
        (self.page - 1) * self.per_page
    }

    /// 실제로 읽을 행 수. fast 모드는 다음 페이지 존재 여부 확인용으로 1행 더
    pub fn fetch_limit(&self) -> usize {
        if self.fast {
            self.per_page + 1
        } else {
            self.per_page
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub per_page: usize,
    pub count: u64,
    pub estimated: bool,
}

impl<T> Page<T> {
    pub fn exact(items: Vec<T>, count: u64, request: &PageRequest) -> Self {
        Self {
            items,
            page: request.page,
            per_page: request.per_page,
            count,
            estimated: false,
        }
    }

    /// fetch_limit 만큼 읽은 행으로 count 를 만들어 냄.
    /// 남는 행이 있으면 다음 페이지가 보이도록 offset + per_page + 1
    pub fn estimated(mut items: Vec<T>, request: &PageRequest) -> Self {
        let fetched = items.len();
        items.truncate(request.per_page);
        Self {
            items,
            page: request.page,
            per_page: request.per_page,
            count: (request.offset() + fetched) as u64,
            estimated: true,
        }
    }

    /// 항목만 변환 (표시용 행으로 바꿀 때)
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            count: self.count,
            estimated: self.estimated,
        }
    }

    pub fn num_pages(&self) -> usize {
        if self.count == 0 {
            return 1;
        }
        ((self.count as usize) + self.per_page - 1) / self.per_page
    }

    pub fn has_next(&self) -> bool {
        self.page < self.num_pages()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fast_page_with_more_rows() {
        let req = PageRequest::new(2, 10, true);
        let page = Page::estimated((0..11).collect::<Vec<_>>(), &req);
        assert_eq!(page.items.len(), 10);
        assert_eq!(page.count, 21);
        assert!(page.has_next());
    }

    #[test]
    fn test_fast_page_last() {
        let req = PageRequest::new(3, 10, true);
        let page = Page::estimated((0..4).collect::<Vec<_>>(), &req);
        assert_eq!(page.count, 24);
        assert_eq!(page.num_pages(), 3);
        assert!(!page.has_next());
    }

    #[test]
    fn test_exact_page() {
        let req = PageRequest::new(1, 50, false);
        let page = Page::exact(vec![1, 2, 3], 3, &req);
        assert_eq!(page.num_pages(), 1);
        assert!(!page.estimated);
    }
}
