use async_trait::async_trait;

use super::{RewriteError, Rewriter};
use crate::domain::types::RewriteRequest;

/// NoopRewriter: トーン付きのプレフィックスを付けて原文を返すモック実装
pub struct NoopRewriter;

#[async_trait]
impl Rewriter for NoopRewriter {
    async fn rewrite(&self, request: &RewriteRequest) -> Result<String, RewriteError> {
        Ok(format!(
            "[{}] {}",
            request.style_profile.tone,
            request.original_text.trim()
        ))
    }

    fn name(&self) -> &str {
        "noop"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::StyleProfile;

    #[tokio::test]
    async fn test_noop_rewriter() {
        let request = RewriteRequest::new(" Hello ", StyleProfile::with_tone("formal"));
        let result = NoopRewriter.rewrite(&request).await.unwrap();
        assert_eq!(result, "[formal] Hello");
    }

    #[test]
    fn test_noop_name() {
        assert_eq!(NoopRewriter.name(), "noop");
    }
}
