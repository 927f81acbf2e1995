use crate::error::CompileError;
use crate::language::trim_token;
use crate::pattern::{FullPhrase, Pattern};
use regex::{Captures, Regex};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::LazyLock;

// [direction=up]
static PARAMETER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\[\s*(\w+)\s*=\s*(\w+)\s*\](.*)$").expect("Invalid regex")
});

// [number:smallNumber]
static TYPED_SLOT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\[\s*(\w+)\s*:\s*(\w+)\s*\](.*)$").expect("Invalid regex")
});

// [query]
static UNTYPED_SLOT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^\[\s*(\w+)\s*\](.*)$").expect("Invalid regex"));

// (find | search | look for |)
static ALTERNATIVES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^\(([^)]*)\)(.*)$").expect("Invalid regex"));

// seek{s}
static ALT_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^}]+)\}").expect("Invalid regex"));

// 下一个 ( 或 [ 之前的词，以及剩余部分
static WORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^([^(\[]+)(.*)$").expect("Invalid regex"));

const RESERVED: &[char] = &['(', ')', '[', ']', '{', '}', '|'];

fn group<'h>(caps: &Captures<'h>, index: usize) -> &'h str {
    caps.get(index).map_or("", |m| m.as_str())
}

/// 按行拆分短语块，忽略空行和 `#`、`//` 注释
pub fn split_phrase_lines(block: &str) -> Vec<&str> {
    block
        .lines()
        .map(str::trim)
        .filter(|line| !(line.is_empty() || line.starts_with('#') || line.starts_with("//")))
        .collect()
}

/// 展开可选后缀：`seek{s}` → `["seek", "seeks"]`，没有花括号时原样返回
pub fn split_alternatives(s: &str) -> Vec<String> {
    if !ALT_WORD.is_match(s) {
        return vec![s.to_string()];
    }
    vec![
        ALT_WORD.replace_all(s, "").into_owned(),
        ALT_WORD.replace_all(s, "$1").into_owned(),
    ]
}

/// 单词 → Word，多个词 → Sequence；去掉标点后没有词时返回 None
fn make_word_matcher(s: &str) -> Option<Pattern> {
    let mut words: Vec<Pattern> = s
        .split_whitespace()
        .map(trim_token)
        .filter(|w| !w.is_empty())
        .map(Pattern::word)
        .collect();
    match words.len() {
        0 => None,
        1 => Some(words.remove(0)),
        _ => Some(Pattern::Sequence(words)),
    }
}

fn check_literal(text: &str, to_parse: &str) -> Result<(), CompileError> {
    if text.contains(RESERVED) {
        return Err(CompileError::Unparseable(to_parse.to_string()));
    }
    Ok(())
}

/// 实体表（名称 → 词条列表）编译为可用于带类型槽位的模式。
/// 必须在编译引用这些实体的短语之前完成。
pub fn compile_entities(
    raw: &HashMap<String, Vec<String>>,
) -> Result<HashMap<String, Pattern>, CompileError> {
    let mut compiled = HashMap::with_capacity(raw.len());
    for (name, surfaces) in raw {
        let children: Vec<Pattern> = surfaces
            .iter()
            .filter_map(|s| make_word_matcher(s))
            .collect();
        if children.is_empty() {
            return Err(CompileError::EmptyEntity(name.clone()));
        }
        log::debug!("实体 {name}: {} 个词条", children.len());
        compiled.insert(name.clone(), Pattern::alternatives(children, false));
    }
    Ok(compiled)
}

/// 把短语模板编译为 [`FullPhrase`]
///
/// 每一步按优先级尝试：静态参数、带类型槽位、无类型槽位、候选组、普通词。
/// 普通词按空白拆成独立的 Word，每个词单独展开可选后缀。
pub fn compile(
    template: &str,
    entities: &HashMap<String, Pattern>,
    intent_name: Option<&str>,
) -> Result<FullPhrase, CompileError> {
    let mut to_parse = template.trim();
    let mut parameters = BTreeMap::new();
    let mut seq = Vec::new();
    let mut slot_names = HashSet::new();

    while !to_parse.is_empty() {
        if let Some(caps) = PARAMETER.captures(to_parse) {
            parameters.insert(group(&caps, 1).to_string(), group(&caps, 2).to_string());
            to_parse = group(&caps, 3).trim_start();
            continue;
        }

        if let Some(caps) = TYPED_SLOT.captures(to_parse) {
            let slot = group(&caps, 1);
            let entity = group(&caps, 2);
            let pattern = entities
                .get(entity)
                .ok_or_else(|| CompileError::UnknownEntity {
                    slot: slot.to_string(),
                    entity: entity.to_string(),
                })?;
            if !slot_names.insert(slot.to_string()) {
                return Err(CompileError::DuplicateSlot(slot.to_string()));
            }
            seq.push(Pattern::slot(pattern.clone(), slot));
            to_parse = group(&caps, 3).trim_start();
            continue;
        }

        if let Some(caps) = UNTYPED_SLOT.captures(to_parse) {
            let slot = group(&caps, 1);
            if !slot_names.insert(slot.to_string()) {
                return Err(CompileError::DuplicateSlot(slot.to_string()));
            }
            seq.push(Pattern::slot(Pattern::Wildcard, slot));
            to_parse = group(&caps, 2).trim_start();
            continue;
        }

        if to_parse.starts_with('(') {
            if let Some(caps) = ALTERNATIVES.captures(to_parse) {
                let alts: Vec<&str> = group(&caps, 1).split('|').map(str::trim).collect();
                let mut allow_empty = alts.iter().any(|alt| alt.is_empty());
                let mut children = Vec::new();
                for alt in alts.iter().filter(|alt| !alt.is_empty()) {
                    for variant in split_alternatives(alt) {
                        check_literal(&variant, to_parse)?;
                        match make_word_matcher(&variant) {
                            Some(pattern) => children.push(pattern),
                            None => allow_empty = true,
                        }
                    }
                }
                if children.is_empty() {
                    return Err(CompileError::EmptyAlternatives(to_parse.to_string()));
                }
                seq.push(Pattern::alternatives(children, allow_empty));
                to_parse = group(&caps, 2).trim_start();
                continue;
            }
        }

        let caps = WORDS
            .captures(to_parse)
            .ok_or_else(|| CompileError::Unparseable(to_parse.to_string()))?;
        for word in group(&caps, 1).split_whitespace() {
            let expanded = split_alternatives(word);
            for variant in &expanded {
                check_literal(variant, to_parse)?;
            }
            // 与 tokenize 一致地去掉首尾标点，纯标点的词直接丢弃
            let variants: Vec<&str> = expanded.iter().map(|v| trim_token(v)).collect();
            match variants.as_slice() {
                [single] if single.is_empty() => {}
                [single] => seq.push(Pattern::word(*single)),
                [_, with] if with.is_empty() => {}
                [without, with] if without.is_empty() => {
                    seq.push(Pattern::alternatives(vec![Pattern::word(*with)], true))
                }
                [without, with] => seq.push(Pattern::alternatives(
                    vec![Pattern::word(*without), Pattern::word(*with)],
                    false,
                )),
                _ => {
                    return Err(CompileError::IllegalAlternatives {
                        source_text: word.to_string(),
                        count: variants.len(),
                    })
                }
            }
        }
        to_parse = group(&caps, 2).trim_start();
    }

    let phrase = FullPhrase {
        body: seq,
        original_source: template.to_string(),
        intent_name: intent_name.map(str::to_string),
        parameters,
    };
    log::debug!("编译模板 {template:?} => {phrase}");
    Ok(phrase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::{tokenize, VocabularyStore};
    use crate::pattern::{Bindings, MatchContext};
    use pretty_assertions::assert_eq;

    fn no_entities() -> HashMap<String, Pattern> {
        HashMap::new()
    }

    fn colors() -> HashMap<String, Pattern> {
        let mut raw = HashMap::new();
        raw.insert(
            "color".to_string(),
            vec!["red".to_string(), "dark blue".to_string()],
        );
        compile_entities(&raw).unwrap()
    }

    fn matches(phrase: &FullPhrase, text: &str) -> Vec<Bindings> {
        let vocab = VocabularyStore::new();
        phrase.match_tokens(&tokenize(text), &MatchContext::exact(&vocab))
    }

    fn slot_text(phrase: &FullPhrase, text: &str, slot: &str) -> Vec<String> {
        let tokens = tokenize(text);
        matches(phrase, text)
            .iter()
            .map(|b| b[slot].text(&tokens))
            .collect()
    }

    #[test]
    fn literal_template_matches_itself() {
        for template in ["stop", "turn it off", "what time is it"] {
            let phrase = compile(template, &no_entities(), None).unwrap();
            assert_eq!(matches(&phrase, template), vec![Bindings::new()]);
        }
    }

    #[test]
    fn punctuated_template_matches_its_own_tokens() {
        for template in ["what time is it?", "stop, please!", "okay -- go", "it's late."] {
            let phrase = compile(template, &no_entities(), None).unwrap();
            assert_eq!(matches(&phrase, template), vec![Bindings::new()], "{template}");
        }

        let phrase = compile("what time is it?", &no_entities(), None).unwrap();
        assert_eq!(phrase.body.last(), Some(&Pattern::word("it")));
    }

    #[test]
    fn punctuation_is_trimmed_in_groups_and_entities() {
        let phrase = compile("(yes! | no.) thanks", &no_entities(), None).unwrap();
        assert_eq!(matches(&phrase, "yes thanks").len(), 1);
        assert_eq!(matches(&phrase, "no, thanks").len(), 1);

        let mut raw = HashMap::new();
        raw.insert("answer".to_string(), vec!["sure!".to_string(), "?".to_string()]);
        let entities = compile_entities(&raw).unwrap();
        assert_eq!(
            entities["answer"],
            Pattern::alternatives(vec![Pattern::word("sure")], false)
        );
    }

    #[test]
    fn bare_words_split_into_separate_words() {
        let phrase = compile("look for", &no_entities(), None).unwrap();
        assert_eq!(phrase.body, vec![Pattern::word("look"), Pattern::word("for")]);
        assert!(matches(&phrase, "look").is_empty());
    }

    #[test]
    fn optional_suffix_expansion() {
        assert_eq!(split_alternatives("seek{s}"), vec!["seek", "seeks"]);
        assert_eq!(split_alternatives("plain"), vec!["plain"]);

        let phrase = compile("seek{s}", &no_entities(), None).unwrap();
        assert_eq!(matches(&phrase, "seek").len(), 1);
        assert_eq!(matches(&phrase, "seeks").len(), 1);
        assert!(matches(&phrase, "seeking").is_empty());
    }

    #[test]
    fn optional_whole_word() {
        let phrase = compile("{please} stop", &no_entities(), None).unwrap();
        assert_eq!(matches(&phrase, "stop").len(), 1);
        assert_eq!(matches(&phrase, "please stop").len(), 1);
    }

    #[test]
    fn parameters_are_not_matched() {
        let phrase = compile("[direction=up] scroll up", &no_entities(), Some("scroll")).unwrap();
        assert_eq!(phrase.parameters.get("direction").map(String::as_str), Some("up"));
        assert_eq!(phrase.intent_name.as_deref(), Some("scroll"));
        assert_eq!(phrase.body.len(), 2);
        assert_eq!(matches(&phrase, "scroll up").len(), 1);
    }

    #[test]
    fn untyped_slot_with_optional_group() {
        let phrase = compile("(find | search | look for |) [query]", &no_entities(), None).unwrap();
        match &phrase.body[0] {
            Pattern::Alternatives {
                children,
                allow_empty,
            } => {
                assert_eq!(children.len(), 3);
                assert!(*allow_empty);
            }
            other => panic!("unexpected pattern {other:?}"),
        }
        assert_eq!(slot_text(&phrase, "look for cats", "query"), vec!["cats"]);
        assert_eq!(slot_text(&phrase, "cats", "query"), vec!["cats"]);
        assert!(matches(&phrase, "look for").is_empty());
    }

    #[test]
    fn alternatives_expand_suffix_shorthand() {
        let phrase = compile("(seek{s} | find) it", &no_entities(), None).unwrap();
        assert_eq!(matches(&phrase, "seeks it").len(), 1);
        assert_eq!(matches(&phrase, "seek it").len(), 1);
        assert_eq!(matches(&phrase, "find it").len(), 1);
        assert!(matches(&phrase, "it").is_empty());
    }

    #[test]
    fn typed_slot_uses_entity_pattern() {
        let phrase = compile("paint it [shade:color]", &colors(), None).unwrap();
        assert_eq!(slot_text(&phrase, "paint it red", "shade"), vec!["red"]);
        assert_eq!(slot_text(&phrase, "paint it dark blue", "shade"), vec!["dark blue"]);
        assert!(matches(&phrase, "paint it green").is_empty());
        assert!(phrase.wildcard_slots().is_empty());
    }

    #[test]
    fn unknown_entity_is_an_error() {
        let err = compile("paint it [shade:colour]", &colors(), None).unwrap_err();
        assert_eq!(
            err,
            CompileError::UnknownEntity {
                slot: "shade".to_string(),
                entity: "colour".to_string(),
            }
        );
    }

    #[test]
    fn duplicate_slot_is_an_error() {
        let err = compile("[a] and [a]", &no_entities(), None).unwrap_err();
        assert_eq!(err, CompileError::DuplicateSlot("a".to_string()));

        let phrase = compile("[a] and [b:color]", &colors(), None).unwrap();
        assert_eq!(phrase.slot_names(), vec!["a", "b"]);
        assert_eq!(phrase.wildcard_slots(), vec!["a"]);
    }

    #[test]
    fn unparseable_suffix_is_reported() {
        let err = compile("open [door", &no_entities(), None).unwrap_err();
        assert_eq!(err, CompileError::Unparseable("[door".to_string()));

        let err = compile("open (door | gate", &no_entities(), None).unwrap_err();
        assert_eq!(err, CompileError::Unparseable("(door | gate".to_string()));

        let err = compile("open | close", &no_entities(), None).unwrap_err();
        assert_eq!(err, CompileError::Unparseable("open | close".to_string()));
    }

    #[test]
    fn empty_group_is_an_error() {
        let err = compile("stop ( | )", &no_entities(), None).unwrap_err();
        assert!(matches!(err, CompileError::EmptyAlternatives(_)));
    }

    #[test]
    fn entities_match_exact_surfaces() {
        let entities = colors();
        let vocab = VocabularyStore::new();
        let ctx = MatchContext::exact(&vocab);
        let color = &entities["color"];

        let red = tokenize("red");
        assert_eq!(color.match_at(&red, 0, &ctx).len(), 1);
        let dark_blue = tokenize("dark blue");
        assert_eq!(color.match_at(&dark_blue, 0, &ctx)[0].position, 2);
        assert!(color.match_at(&tokenize("blue"), 0, &ctx).is_empty());
        assert!(color.match_at(&tokenize("green"), 0, &ctx).is_empty());
    }

    #[test]
    fn empty_entity_is_an_error() {
        let mut raw = HashMap::new();
        raw.insert("nothing".to_string(), vec!["  ".to_string()]);
        assert_eq!(
            compile_entities(&raw).unwrap_err(),
            CompileError::EmptyEntity("nothing".to_string())
        );
    }

    #[test]
    fn phrase_lines_skip_comments() {
        let block = "\n  # comment\nfind [query]\n// other\n\n  search [query]  \n";
        assert_eq!(split_phrase_lines(block), vec!["find [query]", "search [query]"]);
    }
}
