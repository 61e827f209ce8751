//! Provenance recording.
//!
//! Once an answer survives the retrieval gate, the recorder resolves source
//! metadata and a short content preview, composes an attribution sentence,
//! and patches the persisted assistant message. The patch is fire-and-forget:
//! its failure is logged and never blocks or fails the original response.

use std::sync::Arc;

use tracing::warn;

use crate::db::store::{ChatStore, ContentStore, ProvenancePatch};
use crate::types::{ContextStats, SourceInfo};

/// Characters of content included as the preview.
pub const PREVIEW_LENGTH: usize = 200;

pub struct ProvenanceRecorder {
    contents: Arc<dyn ContentStore>,
    chats: Arc<dyn ChatStore>,
}

impl ProvenanceRecorder {
    pub fn new(contents: Arc<dyn ContentStore>, chats: Arc<dyn ChatStore>) -> Self {
        Self { contents, chats }
    }

    /// Resolve source info and build the provenance patch. Best-effort: any
    /// failure is logged and yields `None`, leaving the answer un-attributed.
    pub async fn compose(
        &self,
        content_id: &str,
        user_id: &str,
        stats: ContextStats,
        source_count: usize,
    ) -> Option<ProvenancePatch> {
        let source_info = match self.contents.get_source_info(content_id, user_id).await {
            Ok(Some(info)) => info,
            Ok(None) => {
                warn!(content_id, "source info missing, skipping attribution");
                return None;
            }
            Err(e) => {
                warn!(content_id, error = %e, "source info lookup failed, skipping attribution");
                return None;
            }
        };

        let source_info = self.with_preview(source_info, content_id, user_id).await;
        let attribution = Self::attribution(&source_info.title, source_count);

        Some(ProvenancePatch {
            content_id: content_id.to_string(),
            source_info,
            attribution,
            context_stats: stats,
        })
    }

    /// Apply the patch to the assistant message in the background.
    pub fn attach(self: &Arc<Self>, chat_id: String, message_id: String, patch: ProvenancePatch) {
        let recorder = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = recorder
                .chats
                .patch_message_provenance(&chat_id, &message_id, &patch)
                .await
            {
                warn!(%chat_id, %message_id, error = %e, "provenance patch failed");
            }
        });
    }

    async fn with_preview(
        &self,
        mut source_info: SourceInfo,
        content_id: &str,
        user_id: &str,
    ) -> SourceInfo {
        match self
            .contents
            .get_content_preview(content_id, user_id, PREVIEW_LENGTH)
            .await
        {
            Ok(Some(preview)) => {
                source_info
                    .metadata
                    .insert("preview".to_string(), serde_json::Value::String(preview));
            }
            Ok(None) => {}
            Err(e) => {
                warn!(content_id, error = %e, "content preview lookup failed");
            }
        }
        source_info
    }

    fn attribution(title: &str, source_count: usize) -> String {
        if source_count > 1 {
            format!("Primary source: {} (+{} additional)", title, source_count - 1)
        } else {
            format!("Source: {}", title)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
