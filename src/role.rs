/// Which side of the connection encodes outgoing frames.
///
/// Clients must mask every frame they send; servers must not.
pub trait RolePolicy {
    const MASK_OUTGOING: bool;
    const NAME: &'static str;
}

#[derive(Debug, Clone, Copy)]
pub struct Client;

#[derive(Debug, Clone, Copy)]
pub struct Server;

impl RolePolicy for Client {
    const MASK_OUTGOING: bool = true;
    const NAME: &'static str = "CLI";
}

impl RolePolicy for Server {
    const MASK_OUTGOING: bool = false;
    const NAME: &'static str = "SRV";
}
