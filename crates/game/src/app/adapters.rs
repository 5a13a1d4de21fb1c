use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use mission_engine::mission::{
    ContentPoll, ContentRequest, ContentResponse, ContentService, ContentTicket, ModelView,
    PhaseNotice, Renderer,
};
use mission_engine::sim::Vec2;
use mission_engine::PhaseId;
use tracing::{debug, info};

/// What the pilot can see of the model: the last bodies the renderer drew.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Telemetry {
    pub(crate) flight_altitude: Option<f32>,
    pub(crate) landing_position: Option<Vec2>,
    pub(crate) landing_velocity: Option<Vec2>,
    pub(crate) draws: u64,
}

pub(crate) type SharedTelemetry = Rc<RefCell<Telemetry>>;

/// Headless render adapter: notices go to the log, draws feed telemetry.
pub(crate) struct LogRenderer {
    telemetry: SharedTelemetry,
    surface_live: bool,
}

impl LogRenderer {
    pub(crate) fn new(telemetry: SharedTelemetry) -> Self {
        Self {
            telemetry,
            surface_live: true,
        }
    }
}

impl Renderer for LogRenderer {
    fn show_phase(&mut self, phase: PhaseId, notice: &PhaseNotice) {
        match notice {
            PhaseNotice::Loading | PhaseNotice::Ready => {
                debug!(phase = %phase, notice = ?notice, "phase_notice")
            }
            _ => info!(phase = %phase, notice = ?notice, "phase_notice"),
        }
        if matches!(notice, PhaseNotice::Entered) {
            let mut telemetry = self.telemetry.borrow_mut();
            telemetry.flight_altitude = None;
            telemetry.landing_position = None;
            telemetry.landing_velocity = None;
        }
    }

    fn draw(&mut self, view: &ModelView<'_>) {
        let mut telemetry = self.telemetry.borrow_mut();
        telemetry.draws += 1;
        match view {
            ModelView::Flight { body, .. } => telemetry.flight_altitude = Some(body.position.y),
            ModelView::Landing { body, .. } => {
                telemetry.landing_position = Some(body.position);
                telemetry.landing_velocity = Some(body.velocity);
            }
            ModelView::Exploration(world) => {
                if let Some(actor) = world.controlled() {
                    debug!(
                        actor = %actor.character_id,
                        x = actor.body.position.x,
                        actors = world.actors().len(),
                        "exploration_frame"
                    );
                }
            }
            _ => {}
        }
    }

    fn teardown(&mut self) {
        self.surface_live = false;
        debug!("render_teardown");
    }

    fn surface_ready(&self) -> bool {
        self.surface_live
    }

    fn rebuild_surface(&mut self) {
        self.surface_live = true;
        debug!("render_surface_rebuilt");
    }
}

/// Resolves content to logical asset keys after a fixed number of polls.
#[derive(Debug)]
pub(crate) struct LocalContentService {
    latency_polls: u32,
    next_ticket: u64,
    pending: BTreeMap<ContentTicket, (ContentRequest, u32)>,
}

impl LocalContentService {
    pub(crate) fn new(latency_polls: u32) -> Self {
        Self {
            latency_polls,
            next_ticket: 0,
            pending: BTreeMap::new(),
        }
    }

    fn asset_key(request: &ContentRequest) -> String {
        let name = ["destination", "scene", "character"]
            .iter()
            .find_map(|key| request.params.get(*key))
            .map_or("default", String::as_str);
        format!("{}/{name}", request.kind)
    }
}

impl ContentService for LocalContentService {
    fn request(&mut self, request: ContentRequest) -> ContentTicket {
        self.next_ticket += 1;
        let ticket = ContentTicket(self.next_ticket);
        self.pending.insert(ticket, (request, 0));
        ticket
    }

    fn poll(&mut self, ticket: ContentTicket) -> ContentPoll {
        let Some((request, polls)) = self.pending.get_mut(&ticket) else {
            return ContentPoll::Pending;
        };
        if *polls < self.latency_polls {
            *polls += 1;
            return ContentPoll::Pending;
        }
        let response = ContentResponse::new(Self::asset_key(request));
        self.pending.remove(&ticket);
        ContentPoll::Ready(response)
    }

    fn cancel(&mut self, ticket: ContentTicket) {
        self.pending.remove(&ticket);
    }
}

#[cfg(test)]
mod tests {
    use mission_engine::mission::ContentKind;

    use super::*;

    #[test]
    fn content_resolves_after_latency_then_forgets_the_ticket() {
        let mut content = LocalContentService::new(1);
        let ticket = content.request(
            ContentRequest::new(ContentKind::Destination).with_param("destination", "harbor"),
        );

        assert_eq!(content.poll(ticket), ContentPoll::Pending);
        assert_eq!(
            content.poll(ticket),
            ContentPoll::Ready(ContentResponse::new("destination/harbor"))
        );
        assert_eq!(content.poll(ticket), ContentPoll::Pending);
    }

    #[test]
    fn cancelled_ticket_never_resolves() {
        let mut content = LocalContentService::new(0);
        let ticket = content.request(ContentRequest::new(ContentKind::Briefing));
        content.cancel(ticket);
        assert_eq!(content.poll(ticket), ContentPoll::Pending);
    }

    #[test]
    fn teardown_drops_the_surface_until_rebuilt() {
        let mut renderer = LogRenderer::new(SharedTelemetry::default());
        assert!(renderer.surface_ready());
        renderer.teardown();
        assert!(!renderer.surface_ready());
        renderer.rebuild_surface();
        assert!(renderer.surface_ready());
    }
}
