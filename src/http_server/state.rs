use std::sync::Arc;

use crate::core::Handle;
use crate::templates::Renderer;

#[derive(Clone)]
pub struct ServerState {
	pub core: Handle,
	pub renderer: Arc<Renderer>,
}
