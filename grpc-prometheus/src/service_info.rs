//! The services and methods a server exposes.
//!
//! Pre-registration needs to know every method of the server and whether it
//! streams. tonic doesn't expose that at runtime, so it is described by a
//! [`ServiceInfoProvider`], usually a [`ServiceTable`] built from the file
//! descriptor set that `tonic-build` generates for server reflection.

use crate::error::Result;
use crate::labels::GrpcType;
use prost::Message;
use prost_types::FileDescriptorSet;
use std::collections::BTreeMap;

/// A method of a gRPC service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInfo {
    /// The method name, without the service
    pub name: String,
    pub is_client_stream: bool,
    pub is_server_stream: bool,
}

impl MethodInfo {
    pub fn new(name: impl Into<String>, is_client_stream: bool, is_server_stream: bool) -> Self {
        Self {
            name: name.into(),
            is_client_stream,
            is_server_stream,
        }
    }

    pub fn unary(name: impl Into<String>) -> Self {
        Self::new(name, false, false)
    }

    pub fn client_stream(name: impl Into<String>) -> Self {
        Self::new(name, true, false)
    }

    pub fn server_stream(name: impl Into<String>) -> Self {
        Self::new(name, false, true)
    }

    pub fn bidi_stream(name: impl Into<String>) -> Self {
        Self::new(name, true, true)
    }

    pub fn grpc_type(&self) -> GrpcType {
        GrpcType::from_streaming(self.is_client_stream, self.is_server_stream)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceInfo {
    pub methods: Vec<MethodInfo>,
}

/// Anything that can list the services of a server, keyed by their full
/// name (`package.Service`).
pub trait ServiceInfoProvider {
    fn service_info(&self) -> BTreeMap<String, ServiceInfo>;
}

impl ServiceInfoProvider for BTreeMap<String, ServiceInfo> {
    fn service_info(&self) -> BTreeMap<String, ServiceInfo> {
        self.clone()
    }
}

/// A static description of a server's services.
///
/// ```rust
/// use grpc_prometheus::{MethodInfo, ServiceInfoProvider, ServiceTable};
///
/// let table = ServiceTable::new()
///     .service("Echo", [MethodInfo::unary("Ping"), MethodInfo::bidi_stream("Chat")]);
/// assert_eq!(table.service_info()["Echo"].methods.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceTable {
    services: BTreeMap<String, ServiceInfo>,
}

impl ServiceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add methods to a service. Methods that are already known are replaced.
    pub fn service(
        mut self,
        name: impl Into<String>,
        methods: impl IntoIterator<Item = MethodInfo>,
    ) -> Self {
        let service = self.services.entry(name.into()).or_default();
        for method in methods {
            match service.methods.iter_mut().find(|m| m.name == method.name) {
                Some(existing) => *existing = method,
                None => service.methods.push(method),
            }
        }
        self
    }

    /// Read the services out of an encoded `FileDescriptorSet`, such as the
    /// one `tonic-build` writes with `file_descriptor_set_path`.
    pub fn from_file_descriptor_set(bytes: &[u8]) -> Result<Self> {
        let set = FileDescriptorSet::decode(bytes)?;
        Ok(Self::from_descriptor_set(&set))
    }

    pub fn from_descriptor_set(set: &FileDescriptorSet) -> Self {
        let mut table = Self::new();
        for file in &set.file {
            for service in &file.service {
                let name = match file.package() {
                    "" => service.name().to_string(),
                    package => format!("{package}.{}", service.name()),
                };
                let methods = service.method.iter().map(|method| {
                    MethodInfo::new(
                        method.name(),
                        method.client_streaming(),
                        method.server_streaming(),
                    )
                });
                table = table.service(name, methods);
            }
        }
        table
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl ServiceInfoProvider for ServiceTable {
    fn service_info(&self) -> BTreeMap<String, ServiceInfo> {
        self.services.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use prost_types::{FileDescriptorProto, MethodDescriptorProto, ServiceDescriptorProto};

    fn method(name: &str, client_streaming: bool, server_streaming: bool) -> MethodDescriptorProto {
        MethodDescriptorProto {
            name: Some(name.to_string()),
            input_type: Some(".echo.v1.EchoRequest".to_string()),
            output_type: Some(".echo.v1.EchoResponse".to_string()),
            client_streaming: Some(client_streaming),
            server_streaming: Some(server_streaming),
            ..Default::default()
        }
    }

    fn descriptor_set() -> FileDescriptorSet {
        FileDescriptorSet {
            file: vec![
                FileDescriptorProto {
                    name: Some("echo.proto".to_string()),
                    package: Some("echo.v1".to_string()),
                    service: vec![ServiceDescriptorProto {
                        name: Some("Echo".to_string()),
                        method: vec![
                            method("Ping", false, false),
                            method("Upload", true, false),
                            method("Watch", false, true),
                            method("Chat", true, true),
                        ],
                        ..Default::default()
                    }],
                    ..Default::default()
                },
                FileDescriptorProto {
                    name: Some("health.proto".to_string()),
                    service: vec![ServiceDescriptorProto {
                        name: Some("Health".to_string()),
                        method: vec![method("Check", false, false)],
                        ..Default::default()
                    }],
                    ..Default::default()
                },
            ],
        }
    }

    #[test]
    fn reads_services_from_descriptor_set() {
        let bytes = descriptor_set().encode_to_vec();
        let table = ServiceTable::from_file_descriptor_set(&bytes).unwrap();
        let services = table.service_info();

        assert_eq!(
            services.keys().collect::<Vec<_>>(),
            ["Health", "echo.v1.Echo"]
        );
        let types: Vec<_> = services["echo.v1.Echo"]
            .methods
            .iter()
            .map(|m| (m.name.as_str(), m.grpc_type()))
            .collect();
        assert_eq!(
            types,
            [
                ("Ping", GrpcType::Unary),
                ("Upload", GrpcType::ClientStream),
                ("Watch", GrpcType::ServerStream),
                ("Chat", GrpcType::BidiStream),
            ]
        );
    }

    #[test]
    fn rejects_garbage() {
        let err = ServiceTable::from_file_descriptor_set(&[0xff, 0xff, 0xff]).unwrap_err();
        assert!(matches!(err, Error::Descriptor(_)));
    }

    #[test]
    fn re_adding_a_method_replaces_it() {
        let table = ServiceTable::new()
            .service("Echo", [MethodInfo::unary("Ping")])
            .service("Echo", [MethodInfo::server_stream("Ping")]);
        assert_eq!(
            table.service_info()["Echo"].methods,
            [MethodInfo::server_stream("Ping")]
        );
    }
}
