use super::post::{PostPatch, PostRecord};
use crate::domain::value_objects::PostId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 無限スクロールで読み込んだページの集合。`page_params[i]` は `pages[i]` の取得オフセット。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedCollection {
    #[serde(default)]
    pub pages: Vec<Vec<PostRecord>>,
    #[serde(default)]
    pub page_params: Vec<u64>,
}

impl PagedCollection {
    /// `{pages: [], pageParams: []}`
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(pages: Vec<Vec<PostRecord>>, page_params: Vec<u64>) -> Self {
        Self { pages, page_params }
    }

    pub fn is_seeded(&self) -> bool {
        !self.pages.is_empty()
    }

    pub fn total_len(&self) -> usize {
        self.pages.iter().map(Vec::len).sum()
    }

    pub fn contains(&self, id: &PostId) -> bool {
        self.pages.iter().flatten().any(|record| &record.id == id)
    }

    /// 先頭ページの先頭に追加する。未取得なら1ページだけのコレクションになる。
    pub fn with_prepended(self, record: PostRecord) -> Self {
        if !self.is_seeded() {
            return Self {
                pages: vec![vec![record]],
                page_params: vec![0],
            };
        }

        let mut pages = self.pages.into_iter();
        let mut first_page = Vec::new();
        first_page.push(record);
        first_page.extend(pages.next().unwrap_or_default());

        let page_params = if self.page_params.is_empty() {
            vec![0]
        } else {
            self.page_params
        };

        Self {
            pages: std::iter::once(first_page).chain(pages).collect(),
            page_params,
        }
    }

    /// 同じ `_id` を持つ全ての項目にパッチを当てる。件数と順序は変わらない。
    pub fn with_patched(self, id: &PostId, patch: &PostPatch) -> Self {
        let pages = self
            .pages
            .into_iter()
            .map(|page| {
                page.into_iter()
                    .map(|record| {
                        if &record.id == id {
                            record.merged(patch)
                        } else {
                            record
                        }
                    })
                    .collect()
            })
            .collect();

        Self {
            pages,
            page_params: self.page_params,
        }
    }

    /// 全ページから `_id` が一致する項目を取り除く。`page_params` はそのまま。
    pub fn without(self, id: &PostId) -> Self {
        let pages = self
            .pages
            .into_iter()
            .map(|page| page.into_iter().filter(|record| &record.id != id).collect())
            .collect();

        Self {
            pages,
            page_params: self.page_params,
        }
    }

    /// 取得したページを末尾に足す
    pub fn with_page(mut self, page: Vec<PostRecord>, param: u64) -> Self {
        self.pages.push(page);
        self.page_params.push(param);
        self
    }

    /// 最後のページが空なら、もう続きは無い
    pub fn is_exhausted(&self) -> bool {
        self.pages.last().is_some_and(Vec::is_empty)
    }

    /// 次に取得するページのオフセット。続きが無ければ `None`。
    pub fn next_page_param(&self, page_size: u64) -> Option<u64> {
        if !self.is_seeded() {
            return Some(0);
        }
        if self.is_exhausted() {
            return None;
        }
        Some(self.pages.len() as u64 * page_size)
    }

    /// 型のない値を寛容に読み取る。`pages` が配列でない、`pageParams` に数値以外がある、
    /// 長さが合わない等の壊れた値は未取得扱い。`pageParams` が無いだけなら受け入れる。
    pub fn from_value_lenient(value: &Value) -> Self {
        let Some(raw_pages) = value.get("pages").and_then(Value::as_array) else {
            return Self::empty();
        };

        let mut pages = Vec::with_capacity(raw_pages.len());
        for raw_page in raw_pages {
            let Some(items) = raw_page.as_array() else {
                return Self::empty();
            };
            let page: Option<Vec<PostRecord>> = items.iter().map(PostRecord::from_value).collect();
            match page {
                Some(page) => pages.push(page),
                None => return Self::empty(),
            }
        }

        let page_params: Vec<u64> = match value.get("pageParams") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(params)) => {
                let Some(params) = params.iter().map(Value::as_u64).collect::<Option<Vec<u64>>>()
                else {
                    return Self::empty();
                };
                params
            }
            Some(_) => return Self::empty(),
        };

        if !page_params.is_empty() && page_params.len() != pages.len() {
            return Self::empty();
        }

        Self { pages, page_params }
    }
}

/// ストアに保持される値
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CachedView {
    Paged(PagedCollection),
    Single(PostRecord),
}

impl CachedView {
    pub fn as_paged(&self) -> Option<&PagedCollection> {
        match self {
            CachedView::Paged(collection) => Some(collection),
            CachedView::Single(_) => None,
        }
    }

    pub fn as_single(&self) -> Option<&PostRecord> {
        match self {
            CachedView::Single(record) => Some(record),
            CachedView::Paged(_) => None,
        }
    }
}
