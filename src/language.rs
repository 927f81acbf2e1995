use crate::error::VocabularyError;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// 内置英文词表
pub const BUNDLED_ENGLISH: &str = include_str!("../assets/english.vocab");

/// 词表分节
#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    Aliases,
    Stopwords,
}

/// 词表：停用词、单词别名、多词别名
///
/// 启动时加载一次，之后只读。需要隔离的测试可以 `clear()` 后重新加载。
#[derive(Debug, Default)]
pub struct VocabularyStore {
    /// 规范词 → 单词别名
    aliases: HashMap<String, Vec<String>>,
    /// 规范词 → 多词别名（每个别名是一串词）
    multiword_aliases: HashMap<String, Vec<Vec<String>>>,
    stopwords: HashSet<String>,
    initialized: bool,
}

/// 同一 (key, value) 重复登记视为词表数据错误
fn add_unique<V: PartialEq>(
    map: &mut HashMap<String, Vec<V>>,
    key: &str,
    value: V,
) -> Result<(), V> {
    let values = map.entry(key.to_string()).or_default();
    if values.contains(&value) {
        return Err(value);
    }
    values.push(value);
    Ok(())
}

impl VocabularyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从词表文本构建
    pub fn from_source(source: &str) -> Result<Self, VocabularyError> {
        let mut store = Self::new();
        store.initialize(source)?;
        Ok(store)
    }

    /// 从文件构建
    pub fn from_file(path: &Path) -> Result<Self, VocabularyError> {
        let source = fs::read_to_string(path)?;
        Self::from_source(&source)
    }

    /// 内置英文词表
    pub fn english() -> Result<Self, VocabularyError> {
        Self::from_source(BUNDLED_ENGLISH)
    }

    /// 解析分节词表。已初始化时必须先 `clear()`，失败时保持原状态不变。
    pub fn initialize(&mut self, source: &str) -> Result<(), VocabularyError> {
        if self.initialized {
            return Err(VocabularyError::AlreadyInitialized);
        }

        let mut fresh = Self::new();
        let mut section: Option<Section> = None;

        for (index, raw) in source.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
                continue;
            }

            if line.starts_with('[') {
                let name = line.trim_matches(|c: char| c == '[' || c == ']').trim();
                section = match name {
                    "aliases" => Some(Section::Aliases),
                    "stopwords" => Some(Section::Stopwords),
                    other => {
                        return Err(VocabularyError::UnknownSection {
                            line_no,
                            section: other.to_string(),
                        })
                    }
                };
                continue;
            }

            match section {
                Some(Section::Aliases) => fresh.add_alias(line_no, line)?,
                Some(Section::Stopwords) => fresh.add_stopwords(line),
                None => {
                    return Err(VocabularyError::DataBeforeSection {
                        line_no,
                        line: line.to_string(),
                    })
                }
            }
        }

        fresh.initialized = true;
        log::info!(
            "词表加载完成: {} 个别名, {} 个多词别名, {} 个停用词",
            fresh.aliases_len(),
            fresh.multiword_aliases_len(),
            fresh.stopwords_len()
        );
        *self = fresh;
        Ok(())
    }

    /// 清空所有词条（仅用于测试隔离）
    pub fn clear(&mut self) {
        self.aliases.clear();
        self.multiword_aliases.clear();
        self.stopwords.clear();
        self.initialized = false;
    }

    /// 解析第 line_no 行的 `proper = "alias"`，别名含空格时登记为多词别名
    pub fn add_alias(&mut self, line_no: usize, line: &str) -> Result<(), VocabularyError> {
        let fields: Vec<&str> = line
            .split('=')
            .map(|f| f.trim_matches(|c: char| c == ' ' || c == '\t' || c == '"'))
            .collect();
        if fields.len() != 2 || fields[0].is_empty() || fields[1].is_empty() {
            return Err(VocabularyError::IllegalFormat {
                line_no,
                line: line.to_string(),
            });
        }

        let proper = fields[0].to_lowercase();
        let alias = fields[1].to_lowercase();
        let words: Vec<String> = alias.split_whitespace().map(str::to_string).collect();

        let redundant = if words.len() > 1 {
            add_unique(&mut self.multiword_aliases, &proper, words).is_err()
        } else {
            add_unique(&mut self.aliases, &proper, alias.clone()).is_err()
        };
        if redundant {
            return Err(VocabularyError::RedundantAlias {
                line_no,
                proper,
                alias,
            });
        }
        Ok(())
    }

    /// 按空白切分并登记停用词
    pub fn add_stopwords(&mut self, line: &str) {
        for word in line.split_whitespace() {
            self.stopwords.insert(word.to_lowercase());
        }
    }

    pub fn get_aliases(&self, word: &str) -> &[String] {
        self.aliases
            .get(&word.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn get_multiword_aliases(&self, word: &str) -> &[Vec<String>] {
        self.multiword_aliases
            .get(&word.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_stopword(&self, word: &str) -> bool {
        self.stopwords.contains(&word.to_lowercase())
    }

    pub fn aliases_len(&self) -> usize {
        self.aliases.len()
    }

    pub fn multiword_aliases_len(&self) -> usize {
        self.multiword_aliases.len()
    }

    pub fn stopwords_len(&self) -> usize {
        self.stopwords.len()
    }
}

/// 去掉词首尾的标点，模板编译和转写切词共用
pub(crate) fn trim_token(word: &str) -> &str {
    word.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
}

/// 转写文本切词：小写、按空白切分、去掉首尾标点
pub fn tokenize(utterance: &str) -> Vec<String> {
    utterance
        .split_whitespace()
        .map(|w| trim_token(w).to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}
