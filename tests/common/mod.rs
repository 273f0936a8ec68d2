//! Shared fixtures: a scriptable in-memory transport and test certificates.

#![allow(dead_code)]

use boring::asn1::Asn1Time;
use boring::bn::{BigNum, MsbOption};
use boring::ec::{EcGroup, EcKey};
use boring::hash::MessageDigest;
use boring::nid::Nid;
use boring::pkey::{PKey, Private};
use boring::x509::extension::{BasicConstraints, SubjectAlternativeName};
use boring::x509::{X509Name, X509NameBuilder, X509};
use bytes::Bytes;
use netcall::base::NetError;
use netcall::http::Headers;
use netcall::session::{
    ResponseHead, TaskId, Transport, TransportDelegate, TransportRequest, TransportResponse,
};
use netcall::tls::Certificate;
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Canned reply delivered synchronously from `resume`.
#[derive(Clone)]
pub struct Reply {
    pub status: u16,
    pub headers: Headers,
    pub chunks: Vec<Bytes>,
}

impl Reply {
    pub fn json(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: [("Content-Type".to_string(), "application/json".to_string())]
                .into_iter()
                .collect(),
            chunks: vec![Bytes::copy_from_slice(body.as_bytes())],
        }
    }
}

/// Records every interaction and replies only when told to.
#[derive(Default)]
pub struct MockTransport {
    next_id: AtomicU64,
    pub requests: Mutex<Vec<TransportRequest>>,
    pub resumed: Mutex<Vec<TaskId>>,
    pub cancelled: Mutex<Vec<TaskId>>,
    delegates: Mutex<HashMap<TaskId, Arc<dyn TransportDelegate>>>,
    auto_reply: Mutex<Option<Reply>>,
    reject: Mutex<Option<String>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answer every resumed task with `reply`.
    pub fn replying(reply: Reply) -> Arc<Self> {
        let transport = Self::new();
        *transport.auto_reply.lock().unwrap() = Some(reply);
        transport
    }

    /// Refuse every task at creation.
    pub fn rejecting(reason: &str) -> Arc<Self> {
        let transport = Self::new();
        *transport.reject.lock().unwrap() = Some(reason.to_string());
        transport
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> TransportRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }

    pub fn last_task(&self) -> TaskId {
        *self.resumed.lock().unwrap().last().unwrap()
    }

    fn delegate(&self, id: TaskId) -> Arc<dyn TransportDelegate> {
        Arc::clone(self.delegates.lock().unwrap().get(&id).unwrap())
    }

    pub fn reply(&self, id: TaskId, reply: Reply) {
        let delegate = self.delegate(id);
        for chunk in reply.chunks {
            delegate.on_data(id, chunk);
        }
        delegate.on_complete(
            id,
            Ok(TransportResponse::Http(ResponseHead {
                status: reply.status,
                headers: reply.headers,
                mime_hint: None,
            })),
        );
    }

    pub fn fail(&self, id: TaskId, error: io::Error) {
        self.delegate(id).on_complete(id, Err(error));
    }
}

impl Transport for MockTransport {
    fn create_task(
        &self,
        request: TransportRequest,
        delegate: Arc<dyn TransportDelegate>,
    ) -> Result<TaskId, NetError> {
        if let Some(reason) = self.reject.lock().unwrap().clone() {
            return Err(NetError::InvalidRequest(reason));
        }
        let id = TaskId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.requests.lock().unwrap().push(request);
        self.delegates.lock().unwrap().insert(id, delegate);
        Ok(id)
    }

    fn resume(&self, id: TaskId) {
        self.resumed.lock().unwrap().push(id);
        let reply = self.auto_reply.lock().unwrap().clone();
        if let Some(reply) = reply {
            self.reply(id, reply);
        }
    }

    fn cancel(&self, id: TaskId) {
        self.cancelled.lock().unwrap().push(id);
        self.fail(id, io::Error::new(io::ErrorKind::Interrupted, "cancelled"));
    }
}

/// A generated certificate together with its signing key.
pub struct TestCert {
    pub x509: X509,
    pub key: PKey<Private>,
}

impl TestCert {
    pub fn certificate(&self) -> Certificate {
        Certificate::from_der(self.x509.to_der().unwrap()).unwrap()
    }

    pub fn pem(&self) -> Vec<u8> {
        self.x509.to_pem().unwrap()
    }

    pub fn der(&self) -> Vec<u8> {
        self.x509.to_der().unwrap()
    }
}

fn name(common_name: &str) -> X509Name {
    let mut builder = X509NameBuilder::new().unwrap();
    builder
        .append_entry_by_nid(Nid::COMMONNAME, common_name)
        .unwrap();
    builder.build()
}

fn issue(common_name: &str, dns_name: Option<&str>, ca: bool, issuer: Option<&TestCert>) -> TestCert {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    let key = PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap();

    let mut builder = X509::builder().unwrap();
    builder.set_version(2).unwrap();
    let mut serial = BigNum::new().unwrap();
    serial.rand(64, MsbOption::MAYBE_ZERO, false).unwrap();
    builder
        .set_serial_number(&serial.to_asn1_integer().unwrap())
        .unwrap();

    let subject = name(common_name);
    builder.set_subject_name(&subject).unwrap();
    match issuer {
        Some(issuer) => builder.set_issuer_name(issuer.x509.subject_name()).unwrap(),
        None => builder.set_issuer_name(&subject).unwrap(),
    }
    builder.set_pubkey(&key).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(30).unwrap())
        .unwrap();

    if ca {
        builder
            .append_extension(BasicConstraints::new().critical().ca().build().unwrap())
            .unwrap();
    }
    if let Some(dns_name) = dns_name {
        let san = SubjectAlternativeName::new()
            .dns(dns_name)
            .build(&builder.x509v3_context(None, None))
            .unwrap();
        builder.append_extension(san).unwrap();
    }

    let signing_key = issuer.map(|issuer| &issuer.key).unwrap_or(&key);
    builder.sign(signing_key, MessageDigest::sha256()).unwrap();
    TestCert {
        x509: builder.build(),
        key,
    }
}

/// Self-signed end-entity certificate for `host`.
pub fn self_signed(host: &str) -> TestCert {
    issue(host, Some(host), false, None)
}

/// Self-signed CA certificate.
pub fn root_ca(common_name: &str) -> TestCert {
    issue(common_name, None, true, None)
}

/// Leaf for `host` signed by `ca`.
pub fn leaf_signed_by(host: &str, ca: &TestCert) -> TestCert {
    issue(host, Some(host), false, Some(ca))
}
