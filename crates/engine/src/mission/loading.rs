use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::context::PhaseId;
use super::services::{
    ContentPoll, ContentRequest, ContentResponse, ContentService, ContentTicket, PhaseNotice,
    Services,
};

#[derive(Debug, Clone)]
struct PendingAsset {
    slot: &'static str,
    request: ContentRequest,
    ticket: ContentTicket,
    waited_seconds: f32,
}

/// Loading sub-state shared by every phase. While anything is pending the
/// owning phase must not advance its simulation.
#[derive(Debug, Clone)]
pub struct AssetGate {
    phase: PhaseId,
    timeout_seconds: f32,
    pending: Vec<PendingAsset>,
    resolved: BTreeMap<&'static str, ContentResponse>,
    fallbacks: usize,
}

impl AssetGate {
    pub fn new(phase: PhaseId, timeout_seconds: f32) -> Self {
        Self {
            phase,
            timeout_seconds,
            pending: Vec::new(),
            resolved: BTreeMap::new(),
            fallbacks: 0,
        }
    }

    pub fn request(
        &mut self,
        slot: &'static str,
        request: ContentRequest,
        content: &mut dyn ContentService,
    ) {
        let ticket = content.request(request.clone());
        debug!(phase = %self.phase, slot, kind = %request.kind, ticket = ticket.0, "content_requested");
        self.pending.push(PendingAsset {
            slot,
            request,
            ticket,
            waited_seconds: 0.0,
        });
    }

    pub fn is_ready(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn asset(&self, slot: &str) -> Option<&ContentResponse> {
        self.resolved.get(slot)
    }

    pub fn fallbacks(&self) -> usize {
        self.fallbacks
    }

    /// Polls every outstanding request. Failures and timeouts resolve to a
    /// placeholder. Returns true once nothing is pending.
    pub fn poll(&mut self, dt_seconds: f32, content: &mut dyn ContentService) -> bool {
        let mut still_pending = Vec::with_capacity(self.pending.len());
        for mut pending in std::mem::take(&mut self.pending) {
            match content.poll(pending.ticket) {
                ContentPoll::Ready(response) => {
                    self.resolved.insert(pending.slot, response);
                }
                ContentPoll::Failed(failure) => {
                    warn!(phase = %self.phase, slot = pending.slot, error = %failure, "content_fallback");
                    self.use_placeholder(&pending);
                }
                ContentPoll::Pending => {
                    pending.waited_seconds += dt_seconds;
                    if pending.waited_seconds >= self.timeout_seconds {
                        content.cancel(pending.ticket);
                        warn!(
                            phase = %self.phase,
                            slot = pending.slot,
                            waited_seconds = pending.waited_seconds,
                            "content_timeout_fallback"
                        );
                        self.use_placeholder(&pending);
                    } else {
                        still_pending.push(pending);
                    }
                }
            }
        }
        self.pending = still_pending;
        self.pending.is_empty()
    }

    /// Runs one loading tick for the owning phase and reports whether it is
    /// still blocked.
    pub fn still_loading(&mut self, dt_seconds: f32, services: &mut Services) -> bool {
        if self.is_ready() {
            return false;
        }
        if self.poll(dt_seconds, services.content.as_mut()) {
            services.renderer.show_phase(self.phase, &PhaseNotice::Ready);
        }
        // The tick that finishes loading is still a loading tick.
        true
    }

    pub fn announce(&self, services: &mut Services) {
        if !self.is_ready() {
            services.renderer.show_phase(self.phase, &PhaseNotice::Loading);
        }
    }

    pub fn cancel_all(&mut self, content: &mut dyn ContentService) -> usize {
        let cancelled = self.pending.len();
        for pending in self.pending.drain(..) {
            content.cancel(pending.ticket);
        }
        cancelled
    }

    fn use_placeholder(&mut self, pending: &PendingAsset) {
        self.fallbacks += 1;
        self.resolved
            .insert(pending.slot, ContentResponse::placeholder(pending.request.kind));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mission::testing::ScriptedContent;
    use crate::mission::{ContentKind, LoadFailure};

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn ready_response_is_stored_by_slot() {
        let mut content = ScriptedContent::ready_after(2);
        let mut gate = AssetGate::new(PhaseId::Arrival, 5.0);
        gate.request("scene", ContentRequest::new(ContentKind::Destination), &mut content);

        assert!(!gate.poll(DT, &mut content));
        assert!(!gate.poll(DT, &mut content));
        assert!(gate.poll(DT, &mut content));
        let asset = gate.asset("scene").expect("resolved");
        assert!(!asset.is_placeholder());
        assert_eq!(gate.fallbacks(), 0);
    }

    #[test]
    fn failure_falls_back_to_placeholder() {
        let mut content = ScriptedContent::failing(LoadFailure::new(ContentKind::Backdrop, "503"));
        let mut gate = AssetGate::new(PhaseId::Launch, 5.0);
        gate.request("backdrop", ContentRequest::new(ContentKind::Backdrop), &mut content);

        assert!(gate.poll(DT, &mut content));
        assert!(gate.asset("backdrop").expect("placeholder").is_placeholder());
        assert_eq!(gate.fallbacks(), 1);
    }

    #[test]
    fn hung_request_times_out_and_is_cancelled() {
        let mut content = ScriptedContent::hanging();
        let mut gate = AssetGate::new(PhaseId::Flight, 0.5);
        gate.request("backdrop", ContentRequest::new(ContentKind::Backdrop), &mut content);

        let mut ticks = 0;
        while !gate.poll(DT, &mut content) {
            ticks += 1;
            assert!(ticks < 120, "gate never timed out");
        }
        assert!(gate.asset("backdrop").expect("placeholder").is_placeholder());
        assert_eq!(content.cancelled().len(), 1);
    }

    #[test]
    fn cancel_all_releases_outstanding_tickets() {
        let mut content = ScriptedContent::hanging();
        let mut gate = AssetGate::new(PhaseId::Dispatch, 5.0);
        gate.request("a", ContentRequest::new(ContentKind::Briefing), &mut content);
        gate.request("b", ContentRequest::new(ContentKind::Backdrop), &mut content);

        assert_eq!(gate.cancel_all(&mut content), 2);
        assert!(gate.is_ready());
        assert_eq!(content.cancelled().len(), 2);
    }
}
