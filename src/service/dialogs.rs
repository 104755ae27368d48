//! 特权进程一侧的对话框
//!
//! 选择框与保存路径框由特权进程自己展示，不可信进程只能发起请求、拿到结果。

use std::io::{BufRead, Write};

use async_trait::async_trait;

use crate::domain::PromptSpec;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DialogError {
    #[error("dialog input unavailable: {0}")]
    Unavailable(String),
    #[error("'{0}' is not one of the offered options")]
    InvalidInput(String),
}

/// 对话框接口
#[async_trait]
pub trait DialogProvider: Send + Sync {
    /// 阻塞直到用户选择，返回按钮下标
    async fn choose(&self, prompt: &PromptSpec) -> Result<usize, DialogError>;

    /// 用户取消时返回 `None`
    async fn save_destination(
        &self,
        default_path: &str,
        extensions: &[String],
    ) -> Result<Option<String>, DialogError>;
}

/// 控制台实现：提示写到 stderr，从 stdin 读一行
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleDialogs;

fn read_answer(question: String) -> Result<Option<String>, DialogError> {
    let mut stderr = std::io::stderr();
    stderr
        .write_all(question.as_bytes())
        .and_then(|_| stderr.flush())
        .map_err(|e| DialogError::Unavailable(e.to_string()))?;

    let mut line = String::new();
    let read = std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| DialogError::Unavailable(e.to_string()))?;
    if read == 0 {
        // EOF
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// 解析 1-based 选项编号或选项文字
pub fn parse_choice(answer: &str, options: &[String]) -> Result<usize, DialogError> {
    if let Ok(number) = answer.parse::<usize>() {
        if number >= 1 && number <= options.len() {
            return Ok(number - 1);
        }
    }
    options
        .iter()
        .position(|option| option.eq_ignore_ascii_case(answer))
        .ok_or_else(|| DialogError::InvalidInput(answer.to_string()))
}

#[async_trait]
impl DialogProvider for ConsoleDialogs {
    async fn choose(&self, prompt: &PromptSpec) -> Result<usize, DialogError> {
        let mut question = format!("\n== {} ==\n{}", prompt.title, prompt.message);
        for (index, option) in prompt.options.iter().enumerate() {
            question.push_str(&format!("  [{}] {}\n", index + 1, option));
        }
        question.push_str("> ");

        let options = prompt.options.clone();
        let answer = tokio::task::spawn_blocking(move || read_answer(question))
            .await
            .map_err(|e| DialogError::Unavailable(e.to_string()))??;

        match answer {
            Some(answer) => parse_choice(&answer, &options),
            None => Err(DialogError::Unavailable("stdin closed".to_string())),
        }
    }

    async fn save_destination(
        &self,
        default_path: &str,
        extensions: &[String],
    ) -> Result<Option<String>, DialogError> {
        let question = format!(
            "\nSave recovery file ({}). Enter a path, press Enter for the default, or type 'cancel'.\n  default: {}\n> ",
            extensions.join(", "),
            default_path
        );
        let answer = tokio::task::spawn_blocking(move || read_answer(question))
            .await
            .map_err(|e| DialogError::Unavailable(e.to_string()))??;

        Ok(match answer {
            None => None,
            Some(answer) if answer.eq_ignore_ascii_case("cancel") => None,
            Some(answer) if answer.is_empty() => Some(default_path.to_string()),
            Some(answer) => Some(answer),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> Vec<String> {
        vec!["Derivation Path".to_string(), "Seed".to_string()]
    }

    #[test]
    fn test_parse_choice_by_number() {
        assert_eq!(parse_choice("1", &options()), Ok(0));
        assert_eq!(parse_choice("2", &options()), Ok(1));
        assert!(parse_choice("0", &options()).is_err());
        assert!(parse_choice("3", &options()).is_err());
    }

    #[test]
    fn test_parse_choice_by_label() {
        assert_eq!(parse_choice("seed", &options()), Ok(1));
        assert_eq!(parse_choice("Derivation Path", &options()), Ok(0));
        assert_eq!(
            parse_choice("maybe", &options()),
            Err(DialogError::InvalidInput("maybe".to_string()))
        );
    }
}
