use burrow_core::OwnerId;
use tonic::{Request, Status};

/// Metadata key carrying the caller's owner id.
pub const USER_ID_METADATA: &str = "user_id";

/// Reads the owner id from request metadata and stores it in the request
/// extensions for the handlers.
pub fn resolve_owner(mut request: Request<()>) -> Result<Request<()>, Status> {
    let raw = request
        .metadata()
        .get(USER_ID_METADATA)
        .ok_or_else(|| Status::unauthenticated("missing user_id metadata"))?
        .to_str()
        .map_err(|_| Status::unauthenticated("user_id metadata is not valid ascii"))?;

    let owner = OwnerId::new(raw).map_err(|err| Status::unauthenticated(err.to_string()))?;
    request.extensions_mut().insert(owner);
    Ok(request)
}

pub(crate) fn owner_of<T>(request: &Request<T>) -> Result<OwnerId, Status> {
    request
        .extensions()
        .get::<OwnerId>()
        .cloned()
        .ok_or_else(|| Status::unauthenticated("caller identity was not resolved"))
}
