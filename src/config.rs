use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub vocabulary: VocabularyConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    /// 实体名 → 词条，如 genre = ["jazz", "hip hop"]
    #[serde(default)]
    pub entities: HashMap<String, Vec<String>>,
    /// 意图名 → 短语模板，每行一条
    #[serde(default)]
    pub intents: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VocabularyConfig {
    /// 词表文件，不填则使用内置英文词表
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// 匹配时是否跳过停用词
    #[serde(default = "default_elide_stopwords")]
    pub elide_stopwords: bool,
    /// 低于该分数的结果丢弃
    #[serde(default)]
    pub min_score: f64,
    /// 是否启用闹钟匹配器
    #[serde(default = "default_enable_alarm")]
    pub enable_alarm: bool,
}

fn default_elide_stopwords() -> bool {
    true
}
fn default_enable_alarm() -> bool {
    true
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            elide_stopwords: default_elide_stopwords(),
            min_score: 0.0,
            enable_alarm: default_enable_alarm(),
        }
    }
}

/// 获取配置文件路径
pub fn config_path() -> PathBuf {
    let config_dir = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("voice-intent");
    config_dir.join("config.toml")
}

/// 加载配置，文件不存在则创建默认配置
pub fn load_config() -> Result<AppConfig, String> {
    load_config_from(&config_path())
}

pub fn load_config_from(path: &Path) -> Result<AppConfig, String> {
    if path.exists() {
        let content = fs::read_to_string(path).map_err(|e| format!("读取配置失败: {e}"))?;
        toml::from_str(&content).map_err(|e| format!("解析配置失败: {e}"))
    } else {
        let config = default_config();
        save_config_to(&config, path)?;
        Ok(config)
    }
}

/// 保存配置到文件
pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| format!("创建配置目录失败: {e}"))?;
    }
    let content = toml::to_string_pretty(config).map_err(|e| format!("序列化配置失败: {e}"))?;
    fs::write(path, content).map_err(|e| format!("写入配置失败: {e}"))?;
    Ok(())
}

/// 默认配置
pub fn default_config() -> AppConfig {
    let mut entities = HashMap::new();
    entities.insert(
        "genre".to_string(),
        vec![
            "jazz".to_string(),
            "rock".to_string(),
            "classical".to_string(),
            "hip hop".to_string(),
        ],
    );
    entities.insert(
        "service".to_string(),
        vec!["youtube".to_string(), "spotify".to_string()],
    );

    let mut intents = HashMap::new();
    intents.insert(
        "search".to_string(),
        "(find | search | look for |) [query]\n(find | search | look for) [query] on [service:service]"
            .to_string(),
    );
    intents.insert(
        "music.play".to_string(),
        "play (some |) [genre:genre] (music |)\nplay [genre:genre] on [service:service]".to_string(),
    );
    intents.insert("music.stop".to_string(), "stop (the |) music".to_string());
    intents.insert(
        "scroll".to_string(),
        "[direction=up] scroll up\n[direction=down] scroll down".to_string(),
    );

    AppConfig {
        vocabulary: VocabularyConfig::default(),
        matching: MatchingConfig::default(),
        entities,
        intents,
    }
}
