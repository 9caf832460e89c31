use reqwest::blocking::{Client, Request};

use crate::Result;
use crate::diagnosis::ApiResponse;

/// Sends a fully signed request and hands back the read response.
///
/// Implementations own timeouts and connection handling; the connector imposes none.
pub trait Transport {
    fn send(&self, request: Request) -> Result<ApiResponse>;
}

impl Transport for Client {
    fn send(&self, request: Request) -> Result<ApiResponse> {
        let response = self.execute(request)?;
        ApiResponse::read(response)
    }
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: Request) -> Result<ApiResponse> {
        (**self).send(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&self, request: Request) -> Result<ApiResponse> {
        (**self).send(request)
    }
}
