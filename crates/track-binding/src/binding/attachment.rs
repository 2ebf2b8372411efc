//! What a bound consumer attaches, and the quality request that goes with it.

use common::types::ParticipantId;
use serde::{Deserialize, Serialize};

use crate::identity::BindingTarget;

/// Media element that carries the local camera preview.
pub const LOCAL_PREVIEW_ELEMENT: &str = "cornerVideo";

/// Shape of the consumer surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceKind {
    /// Plane, box or any other mesh textured with the video.
    #[default]
    Flat,
    /// 360° video sphere; wants the highest resolution available.
    Panoramic,
}

impl SurfaceKind {
    #[must_use]
    pub fn is_panoramic(self) -> bool {
        self == SurfaceKind::Panoramic
    }
}

/// Quality adjustment requested alongside an attach.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QualityRequest {
    /// Binding our own track: renegotiate the upload.
    RenegotiateUpload { max_resolution: bool },
    /// Binding a remote track: receive-side hint for that participant.
    ReceiveHint {
        participant_id: ParticipantId,
        max_resolution: bool,
    },
}

/// Everything a consumer needs to attach a resolved track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub target: BindingTarget,
    pub surface: SurfaceKind,
    /// Id of the media element holding the track.
    pub media_element: String,
    pub quality: QualityRequest,
}

impl Attachment {
    #[must_use]
    pub fn new(target: BindingTarget, surface: SurfaceKind) -> Self {
        let max_resolution = surface.is_panoramic();
        let (media_element, quality) = match &target {
            BindingTarget::Local(_) => (
                LOCAL_PREVIEW_ELEMENT.to_string(),
                QualityRequest::RenegotiateUpload { max_resolution },
            ),
            BindingTarget::Remote(id) => (
                format!("video{id}"),
                QualityRequest::ReceiveHint {
                    participant_id: id.clone(),
                    max_resolution,
                },
            ),
        };

        Self {
            target,
            surface,
            media_element,
            quality,
        }
    }

    /// Whether attaching requires renegotiating our own upload.
    #[must_use]
    pub fn needs_upload_renegotiation(&self) -> bool {
        matches!(self.quality, QualityRequest::RenegotiateUpload { .. })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_local_attachment_renegotiates_upload() {
        let attachment = Attachment::new(BindingTarget::Local("p0".into()), SurfaceKind::Panoramic);
        assert_eq!(attachment.media_element, LOCAL_PREVIEW_ELEMENT);
        assert_eq!(
            attachment.quality,
            QualityRequest::RenegotiateUpload {
                max_resolution: true
            }
        );
        assert!(attachment.needs_upload_renegotiation());
    }

    #[test]
    fn test_remote_attachment_sets_receive_hint() {
        let attachment = Attachment::new(BindingTarget::Remote("p2".into()), SurfaceKind::Flat);
        assert_eq!(attachment.media_element, "videop2");
        assert_eq!(
            attachment.quality,
            QualityRequest::ReceiveHint {
                participant_id: "p2".into(),
                max_resolution: false,
            }
        );
        assert!(!attachment.needs_upload_renegotiation());
    }

    #[test]
    fn test_panoramic_remote_asks_for_max_resolution() {
        let attachment =
            Attachment::new(BindingTarget::Remote("p2".into()), SurfaceKind::Panoramic);
        assert!(matches!(
            attachment.quality,
            QualityRequest::ReceiveHint {
                max_resolution: true,
                ..
            }
        ));
    }
}
