pub mod alarm;
pub mod compiler;
pub mod config;
pub mod error;
pub mod intent;
pub mod language;
pub mod pattern;
pub mod voice_commands;

use config::{default_config, load_config};
use std::io::{self, BufRead};
use voice_commands::{MatchResult, VoiceCommandMatcher};

fn print_result(matcher: &VoiceCommandMatcher, text: &str) {
    if text.trim().is_empty() {
        return;
    }
    match matcher.match_text(text) {
        MatchResult::Intents(results) => {
            for result in results {
                let action = serde_json::to_string(&result.action).unwrap_or_default();
                println!("{:.2}\t{}\t{}", result.score, result.name, action);
            }
        }
        MatchResult::Text(t) => println!("[文本] {t}"),
    }
}

/// 命令行入口：参数中的每一段文本作为一条转写，没有参数时逐行读取标准输入
pub fn run() {
    env_logger::init();

    let config = load_config().unwrap_or_else(|e| {
        log::warn!("加载配置失败: {e}，使用默认配置");
        default_config()
    });

    let matcher = match VoiceCommandMatcher::from_config(&config) {
        Ok(m) => m,
        Err(e) => {
            log::error!("初始化匹配器失败: {e}");
            std::process::exit(1);
        }
    };

    let args: Vec<String> = std::env::args().skip(1).collect();
    if !args.is_empty() {
        for text in &args {
            print_result(&matcher, text);
        }
        return;
    }

    for line in io::stdin().lock().lines() {
        match line {
            Ok(text) => print_result(&matcher, &text),
            Err(e) => {
                log::error!("读取输入失败: {e}");
                break;
            }
        }
    }
}
