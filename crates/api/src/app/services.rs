//! In-memory infrastructure wiring for the API process.

use std::sync::Arc;

use stardust_infra::{
    approval_workflow::{ApprovalWorkflow, Collaborators},
    config::{ConfigParameters, InMemoryConfigParameters, ServerConfig},
    directory::InMemoryDirectory,
    event_store::InMemoryEventStore,
    mail::{ConfiguredSender, InMemoryOutbox},
    portal::VendorPortal,
    projections::purchasing::{PurchaseOrderReadModel, PurchaseOrdersProjection},
    read_model::InMemoryReadStore,
};
use stardust_purchasing::PurchaseOrderId;

pub type EventStoreHandle = Arc<InMemoryEventStore>;
pub type PurchaseOrderStore = Arc<InMemoryReadStore<PurchaseOrderId, PurchaseOrderReadModel>>;

pub struct AppServices {
    pub workflow: ApprovalWorkflow<EventStoreHandle, PurchaseOrderStore>,
    pub portal: VendorPortal<PurchaseOrderStore>,
    pub directory: Arc<InMemoryDirectory>,
    pub params: Arc<InMemoryConfigParameters>,
    pub outbox: Arc<InMemoryOutbox>,
}

pub fn build_services(config: &ServerConfig) -> AppServices {
    let store: EventStoreHandle = Arc::new(InMemoryEventStore::new());
    let rm_store: PurchaseOrderStore = Arc::new(InMemoryReadStore::new());
    let projection = Arc::new(PurchaseOrdersProjection::new(rm_store));

    let params = Arc::new(InMemoryConfigParameters::new());
    config.seed(params.as_ref());
    if params.get_param(stardust_infra::config::SMTP_FROM_KEY).is_none() {
        tracing::warn!("SMTP_FROM not set; vendor notifications will not be sent");
    }

    let directory = Arc::new(InMemoryDirectory::new());
    let outbox = Arc::new(InMemoryOutbox::new());

    let deps = Collaborators {
        params: params.clone(),
        directory: directory.clone(),
        mailer: outbox.clone(),
        sender: Arc::new(ConfiguredSender::new(params.clone())),
    };

    AppServices {
        workflow: ApprovalWorkflow::new(store, projection.clone(), deps),
        portal: VendorPortal::new(projection, directory.clone()),
        directory,
        params,
        outbox,
    }
}
