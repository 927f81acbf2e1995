use crate::alarm::AlarmIntentMatcher;
use crate::compiler::{compile, compile_entities, split_phrase_lines};
use crate::config::AppConfig;
use crate::error::EngineError;
use crate::intent::{rank, Action, IntentMatcher, IntentMatcherResult};
use crate::language::{tokenize, VocabularyStore};
use crate::pattern::{Bindings, FullPhrase, MatchContext};
use std::collections::HashMap;
use std::sync::Arc;

/// 短语模板匹配器：把编译好的 FullPhrase 包装成 IntentMatcher
pub struct PhraseIntentMatcher {
    vocabulary: Arc<VocabularyStore>,
    phrases: Vec<FullPhrase>,
    elide_stopwords: bool,
}

impl PhraseIntentMatcher {
    pub fn new(vocabulary: Arc<VocabularyStore>, elide_stopwords: bool) -> Self {
        Self {
            vocabulary,
            phrases: Vec::new(),
            elide_stopwords,
        }
    }

    /// 先编译实体，再按意图名顺序编译每个短语块
    pub fn from_intents(
        vocabulary: Arc<VocabularyStore>,
        intents: &HashMap<String, String>,
        entities: &HashMap<String, Vec<String>>,
        elide_stopwords: bool,
    ) -> Result<Self, EngineError> {
        let entities = compile_entities(entities).map_err(EngineError::Entity)?;
        let mut matcher = Self::new(vocabulary, elide_stopwords);

        let mut names: Vec<&String> = intents.keys().collect();
        names.sort();
        for name in names {
            for line in split_phrase_lines(&intents[name]) {
                let phrase = compile(line, &entities, Some(name.as_str())).map_err(|source| {
                    EngineError::Compile {
                        intent: name.clone(),
                        source,
                    }
                })?;
                matcher.add_phrase(phrase);
            }
        }
        Ok(matcher)
    }

    pub fn add_phrase(&mut self, phrase: FullPhrase) {
        self.phrases.push(phrase);
    }

    pub fn phrases(&self) -> &[FullPhrase] {
        &self.phrases
    }

    /// 通配槽位捕获的词越多，分数越低
    fn score(phrase: &FullPhrase, bindings: &Bindings, total: usize) -> f64 {
        let wildcard_tokens: usize = phrase
            .wildcard_slots()
            .iter()
            .filter_map(|name| bindings.get(name))
            .map(|span| span.len())
            .sum();
        1.0 - 0.5 * wildcard_tokens as f64 / total as f64
    }

    fn to_result(
        phrase: &FullPhrase,
        bindings: &Bindings,
        tokens: &[String],
        transcript: &str,
    ) -> IntentMatcherResult {
        let name = phrase
            .intent_name
            .clone()
            .unwrap_or_else(|| phrase.original_source.clone());
        let mut action = Action::new(name.clone());
        for (key, value) in &phrase.parameters {
            action = action.with_extra(key.clone(), value.clone());
        }
        for (slot, span) in bindings {
            action = action.with_extra(slot.clone(), span.text(tokens));
        }
        IntentMatcherResult::new(
            Self::score(phrase, bindings, tokens.len()),
            name,
            transcript,
            action,
        )
    }
}

impl IntentMatcher for PhraseIntentMatcher {
    fn match_transcript(&self, transcript: &str) -> Vec<IntentMatcherResult> {
        let tokens = tokenize(transcript);
        if tokens.is_empty() {
            return Vec::new();
        }
        let ctx = MatchContext {
            vocabulary: &self.vocabulary,
            elide_stopwords: self.elide_stopwords,
        };

        let mut results = Vec::new();
        for phrase in &self.phrases {
            for bindings in phrase.match_tokens(&tokens, &ctx) {
                log::debug!("短语 {:?} 匹配: {:?}", phrase.original_source, bindings);
                results.push(Self::to_result(phrase, &bindings, &tokens, transcript));
            }
        }
        results
    }
}

/// 匹配结果
pub enum MatchResult {
    /// 匹配到意图，按分数从高到低
    Intents(Vec<IntentMatcherResult>),
    /// 未匹配，返回原始文本用于输入
    Text(String),
}

/// 语音指令匹配器：依次尝试所有匹配策略，合并后按分数排序
pub struct VoiceCommandMatcher {
    matchers: Vec<Box<dyn IntentMatcher>>,
    min_score: f64,
}

impl VoiceCommandMatcher {
    pub fn new(min_score: f64) -> Self {
        Self {
            matchers: Vec::new(),
            min_score,
        }
    }

    pub fn with_matcher(mut self, matcher: Box<dyn IntentMatcher>) -> Self {
        self.matchers.push(matcher);
        self
    }

    /// 按配置加载词表、编译全部短语
    pub fn from_config(config: &AppConfig) -> Result<Self, EngineError> {
        let vocabulary = match &config.vocabulary.path {
            Some(path) => {
                log::info!("加载词表: {}", path.display());
                VocabularyStore::from_file(path)?
            }
            None => VocabularyStore::english()?,
        };

        let phrases = PhraseIntentMatcher::from_intents(
            Arc::new(vocabulary),
            &config.intents,
            &config.entities,
            config.matching.elide_stopwords,
        )?;
        log::info!(
            "已编译 {} 个意图, {} 条短语",
            config.intents.len(),
            phrases.phrases().len()
        );

        let mut matcher = Self::new(config.matching.min_score).with_matcher(Box::new(phrases));
        if config.matching.enable_alarm {
            matcher = matcher.with_matcher(Box::new(AlarmIntentMatcher::new()));
        }
        Ok(matcher)
    }

    /// 所有策略的结果，低于 min_score 的丢弃
    pub fn match_transcript(&self, transcript: &str) -> Vec<IntentMatcherResult> {
        let results = self
            .matchers
            .iter()
            .flat_map(|m| m.match_transcript(transcript))
            .filter(|r| r.score >= self.min_score)
            .collect();
        rank(results)
    }

    /// 有意图则返回排序后的结果，否则当作普通文本
    pub fn match_text(&self, text: &str) -> MatchResult {
        let trimmed = text.trim();
        let results = self.match_transcript(trimmed);
        if results.is_empty() {
            MatchResult::Text(trimmed.to_string())
        } else {
            log::info!("语音指令匹配: {} → {}", trimmed, results[0].name);
            MatchResult::Intents(results)
        }
    }
}
