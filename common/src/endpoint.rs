use anyhow::{Context, Result};
use nix::unistd::getuid;
use std::{
    env,
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
};

/// Variable de entorno para forzar la dirección del coordinator.
pub const ADDR_ENV: &str = "MR_COORDINATOR_ADDR";

const PORT_BASE: u16 = 20000;
const PORT_SPAN: u32 = 20000;

/// Puerto de loopback del coordinator para un uid dado.
/// Cada usuario del host tiene el suyo, así dos jobs no chocan.
pub fn port_for_uid(uid: u32) -> u16 {
    PORT_BASE + (uid % PORT_SPAN) as u16
}

/// Dirección por defecto: 127.0.0.1 con el puerto del usuario actual.
pub fn default_coordinator_addr() -> SocketAddr {
    SocketAddrV4::new(Ipv4Addr::LOCALHOST, port_for_uid(getuid().as_raw())).into()
}

/// Dirección del coordinator:
/// - MR_COORDINATOR_ADDR si está definida (ej: 127.0.0.1:9999)
/// - si no, la derivada del uid
pub fn coordinator_addr() -> Result<SocketAddr> {
    resolve_addr(env::var(ADDR_ENV).ok())
}

fn resolve_addr(raw: Option<String>) -> Result<SocketAddr> {
    match raw {
        Some(s) => s
            .parse()
            .with_context(|| format!("{} inválida: {}", ADDR_ENV, s)),
        None => Ok(default_coordinator_addr()),
    }
}

pub fn base_url(addr: SocketAddr) -> String {
    format!("http://{}", addr)
}
