use crate::language::VocabularyStore;
use std::collections::BTreeMap;
use std::fmt;

/// 槽位在词序列中捕获的区间 `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotSpan {
    pub start: usize,
    pub end: usize,
}

impl SlotSpan {
    pub(crate) fn len(&self) -> usize {
        self.end - self.start
    }

    /// 取出区间对应的原文
    pub fn text(&self, tokens: &[String]) -> String {
        tokens[self.start..self.end].join(" ")
    }
}

/// 槽位名 → 捕获区间
pub type Bindings = BTreeMap<String, SlotSpan>;

/// 一次可行的匹配延续：新的位置和途经槽位的绑定
#[derive(Debug, Clone, PartialEq)]
pub struct MatchState {
    pub position: usize,
    /// 实际消耗的第一个词的位置，跳过的停用词不算；未消耗任何词时为 None
    pub first: Option<usize>,
    pub bindings: Bindings,
}

impl MatchState {
    fn at(position: usize) -> Self {
        Self {
            position,
            first: None,
            bindings: Bindings::new(),
        }
    }

    fn consumed(start: usize, end: usize) -> Self {
        Self {
            position: end,
            first: Some(start),
            bindings: Bindings::new(),
        }
    }
}

fn push_unique(states: &mut Vec<MatchState>, state: MatchState) {
    if !states.contains(&state) {
        states.push(state);
    }
}

/// 匹配时的上下文：词表及是否允许跳过停用词
#[derive(Debug, Clone, Copy)]
pub struct MatchContext<'a> {
    pub vocabulary: &'a VocabularyStore,
    pub elide_stopwords: bool,
}

impl<'a> MatchContext<'a> {
    pub fn new(vocabulary: &'a VocabularyStore) -> Self {
        Self {
            vocabulary,
            elide_stopwords: true,
        }
    }

    /// 严格匹配，不跳过停用词
    pub fn exact(vocabulary: &'a VocabularyStore) -> Self {
        Self {
            vocabulary,
            elide_stopwords: false,
        }
    }

    fn is_stopword(&self, token: &str) -> bool {
        self.elide_stopwords && self.vocabulary.is_stopword(token)
    }

    /// 从 position 开始可用的起点：原位置，以及跳过连续停用词后的各位置
    fn starts(&self, tokens: &[String], position: usize) -> Vec<usize> {
        let mut starts = vec![position];
        let mut p = position;
        while p < tokens.len() && self.is_stopword(&tokens[p]) {
            p += 1;
            starts.push(p);
        }
        starts
    }

    /// position 之后是否只剩停用词
    fn only_stopwords_from(&self, tokens: &[String], position: usize) -> bool {
        tokens
            .get(position..)
            .is_some_and(|rest| rest.iter().all(|t| self.is_stopword(t)))
    }
}

/// 编译后的匹配树
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    /// 匹配一个相等的词（忽略大小写），也接受词表中的别名
    Word(String),
    /// 匹配任意一个词
    Wildcard,
    /// 依次匹配各子模式；空序列直接成功
    Sequence(Vec<Pattern>),
    /// 任一子模式匹配即可；`allow_empty` 时也可以不消耗任何词
    Alternatives {
        children: Vec<Pattern>,
        allow_empty: bool,
    },
    /// 捕获内层模式匹配到的区间
    Slot { inner: Box<Pattern>, name: String },
}

impl Pattern {
    pub fn word(text: impl Into<String>) -> Self {
        Pattern::Word(text.into())
    }

    pub fn slot(inner: Pattern, name: impl Into<String>) -> Self {
        Pattern::Slot {
            inner: Box::new(inner),
            name: name.into(),
        }
    }

    pub fn alternatives(children: Vec<Pattern>, allow_empty: bool) -> Self {
        Pattern::Alternatives {
            children,
            allow_empty,
        }
    }

    /// 从 position 开始匹配，返回所有可行的延续。没有延续即不匹配。
    pub fn match_at(
        &self,
        tokens: &[String],
        position: usize,
        ctx: &MatchContext<'_>,
    ) -> Vec<MatchState> {
        match self {
            Pattern::Word(word) => {
                let mut states = Vec::new();
                for start in ctx.starts(tokens, position) {
                    for end in match_word(word, tokens, start, ctx) {
                        push_unique(&mut states, MatchState::consumed(start, end));
                    }
                }
                states
            }
            Pattern::Wildcard => {
                let mut states = Vec::new();
                for start in ctx.starts(tokens, position) {
                    if start < tokens.len() {
                        push_unique(&mut states, MatchState::consumed(start, start + 1));
                    }
                }
                states
            }
            Pattern::Sequence(children) => match_sequence(children, tokens, position, ctx),
            Pattern::Alternatives {
                children,
                allow_empty,
            } => {
                let mut states = Vec::new();
                for child in children {
                    for state in child.match_at(tokens, position, ctx) {
                        push_unique(&mut states, state);
                    }
                }
                if *allow_empty {
                    push_unique(&mut states, MatchState::at(position));
                }
                states
            }
            Pattern::Slot { inner, name } => {
                let mut states = Vec::new();
                for mut state in inner.match_at(tokens, position, ctx) {
                    let span = SlotSpan {
                        start: state.first.unwrap_or(state.position),
                        end: state.position,
                    };
                    state.bindings.insert(name.clone(), span);
                    push_unique(&mut states, state);
                }
                states
            }
        }
    }

    /// 按出现顺序收集槽位名
    fn collect_slot_names(&self, names: &mut Vec<String>) {
        match self {
            Pattern::Word(_) | Pattern::Wildcard => {}
            Pattern::Sequence(children) | Pattern::Alternatives { children, .. } => {
                for child in children {
                    child.collect_slot_names(names);
                }
            }
            Pattern::Slot { inner, name } => {
                names.push(name.clone());
                inner.collect_slot_names(names);
            }
        }
    }

    fn collect_wildcard_slots(&self, names: &mut Vec<String>) {
        match self {
            Pattern::Word(_) | Pattern::Wildcard => {}
            Pattern::Sequence(children) | Pattern::Alternatives { children, .. } => {
                for child in children {
                    child.collect_wildcard_slots(names);
                }
            }
            Pattern::Slot { inner, name } => {
                if **inner == Pattern::Wildcard {
                    names.push(name.clone());
                } else {
                    inner.collect_wildcard_slots(names);
                }
            }
        }
    }
}

/// Word 在 start 处能到达的结束位置：原词、单词别名、多词别名
fn match_word(word: &str, tokens: &[String], start: usize, ctx: &MatchContext<'_>) -> Vec<usize> {
    let mut ends = Vec::new();
    let Some(token) = tokens.get(start) else {
        return ends;
    };
    let token = token.to_lowercase();

    if token == word.to_lowercase()
        || ctx.vocabulary.get_aliases(word).iter().any(|a| *a == token)
    {
        ends.push(start + 1);
    }

    for alias in ctx.vocabulary.get_multiword_aliases(word) {
        let end = start + alias.len();
        let matched = tokens
            .get(start..end)
            .is_some_and(|run| run.iter().zip(alias).all(|(t, a)| t.to_lowercase() == *a));
        if matched && !ends.contains(&end) {
            ends.push(end);
        }
    }
    ends
}

fn match_sequence(
    children: &[Pattern],
    tokens: &[String],
    position: usize,
    ctx: &MatchContext<'_>,
) -> Vec<MatchState> {
    let mut states = vec![MatchState::at(position)];
    for child in children {
        let mut next = Vec::new();
        for state in &states {
            for found in child.match_at(tokens, state.position, ctx) {
                let mut bindings = state.bindings.clone();
                bindings.extend(found.bindings);
                push_unique(
                    &mut next,
                    MatchState {
                        position: found.position,
                        first: state.first.or(found.first),
                        bindings,
                    },
                );
            }
        }
        if next.is_empty() {
            return next;
        }
        states = next;
    }
    states
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Word(word) => write!(f, "{word}"),
            Pattern::Wildcard => write!(f, "*"),
            Pattern::Sequence(children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{child}")?;
                }
                Ok(())
            }
            Pattern::Alternatives {
                children,
                allow_empty,
            } => {
                write!(f, "(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{child}")?;
                }
                if *allow_empty {
                    write!(f, " |")?;
                }
                write!(f, ")")
            }
            Pattern::Slot { inner, name } => match **inner {
                Pattern::Wildcard => write!(f, "[{name}]"),
                _ => write!(f, "[{name}:{inner}]"),
            },
        }
    }
}

/// 一条编译完成的短语模板，匹配入口
#[derive(Debug, Clone, PartialEq)]
pub struct FullPhrase {
    /// 按顺序匹配的主体
    pub body: Vec<Pattern>,
    pub original_source: String,
    pub intent_name: Option<String>,
    /// 模板里声明的静态参数，如 `[direction=up]`
    pub parameters: BTreeMap<String, String>,
}

impl FullPhrase {
    pub fn match_at(
        &self,
        tokens: &[String],
        position: usize,
        ctx: &MatchContext<'_>,
    ) -> Vec<MatchState> {
        match_sequence(&self.body, tokens, position, ctx)
    }

    /// 整句匹配：必须消耗全部词（允许末尾剩下停用词），每种解释返回一份绑定
    pub fn match_tokens(&self, tokens: &[String], ctx: &MatchContext<'_>) -> Vec<Bindings> {
        let mut complete: Vec<Bindings> = Vec::new();
        for state in self.match_at(tokens, 0, ctx) {
            let done = state.position == tokens.len()
                || ctx.only_stopwords_from(tokens, state.position);
            if done && !complete.contains(&state.bindings) {
                complete.push(state.bindings);
            }
        }
        complete
    }

    pub fn slot_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for pattern in &self.body {
            pattern.collect_slot_names(&mut names);
        }
        names
    }

    /// 内层为 Wildcard 的槽位名
    pub fn wildcard_slots(&self) -> Vec<String> {
        let mut names = Vec::new();
        for pattern in &self.body {
            pattern.collect_wildcard_slots(&mut names);
        }
        names
    }
}

impl fmt::Display for FullPhrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.parameters {
            write!(f, "[{name}={value}]")?;
        }
        for (i, pattern) in self.body.iter().enumerate() {
            if i > 0 || !self.parameters.is_empty() {
                write!(f, " ")?;
            }
            write!(f, "{pattern}")?;
        }
        Ok(())
    }
}
