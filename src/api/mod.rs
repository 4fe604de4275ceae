pub mod jsonapi;

pub use jsonapi::{
    collection_document, link, list_params, parse_body, relationship_document, resource_document, Linkage,
    RelationshipObject, ResourceIdentifier, ResourceObject, ResourcePayload, CONTENT_TYPE,
};
