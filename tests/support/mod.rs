#![allow(dead_code)]

use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::ssl::{Ssl, SslContext, SslMethod, SslVersion};
use openssl::x509::extension::SubjectAlternativeName;
use openssl::x509::{X509NameBuilder, X509};
use std::pin::Pin;
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio_openssl::SslStream;

/// What a throwaway loopback server is willing to negotiate.
pub struct ServerProfile {
    pub min: SslVersion,
    pub max: SslVersion,
    pub cipher_list: &'static str,
    pub ciphersuites: Option<&'static str>,
}

impl ServerProfile {
    pub fn modern() -> Self {
        Self {
            min: SslVersion::TLS1_2,
            max: SslVersion::TLS1_3,
            cipher_list: "ECDHE-RSA-AES128-GCM-SHA256:ECDHE-RSA-AES256-GCM-SHA384",
            ciphersuites: Some("TLS_AES_128_GCM_SHA256"),
        }
    }

    pub fn tls12_only() -> Self {
        Self {
            min: SslVersion::TLS1_2,
            max: SslVersion::TLS1_2,
            cipher_list: "ECDHE-RSA-AES256-GCM-SHA384",
            ciphersuites: None,
        }
    }

    pub fn legacy_tls10() -> Self {
        Self {
            min: SslVersion::TLS1,
            max: SslVersion::TLS1,
            cipher_list: "ECDHE-RSA-AES128-SHA:@SECLEVEL=0",
            ciphersuites: None,
        }
    }
}

pub fn self_signed() -> (X509, PKey<Private>) {
    let key = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();

    let mut name = X509NameBuilder::new().unwrap();
    for (nid, value) in [
        (Nid::COMMONNAME, "localhost"),
        (Nid::ORGANIZATIONNAME, "Survey Test"),
    ] {
        name.append_entry_by_nid(nid, value).unwrap();
    }
    let name = name.build();

    let mut builder = X509::builder().unwrap();
    builder.set_version(2).unwrap();
    let serial = BigNum::from_u32(4242).unwrap().to_asn1_integer().unwrap();
    builder.set_serial_number(&serial).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(&key).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(90).unwrap())
        .unwrap();
    let san = SubjectAlternativeName::new()
        .dns("localhost")
        .build(&builder.x509v3_context(None, None))
        .unwrap();
    builder.append_extension(san).unwrap();
    builder.sign(&key, MessageDigest::sha256()).unwrap();

    (builder.build(), key)
}

/// Starts a TLS server on an ephemeral loopback port and returns the port.
/// Every accepted connection is handshaken and held until the client leaves.
pub async fn spawn_tls_server(profile: ServerProfile) -> u16 {
    let (cert, key) = self_signed();

    let mut ctx = SslContext::builder(SslMethod::tls_server()).unwrap();
    ctx.set_certificate(&cert).unwrap();
    ctx.set_private_key(&key).unwrap();
    ctx.set_min_proto_version(Some(profile.min)).unwrap();
    ctx.set_max_proto_version(Some(profile.max)).unwrap();
    ctx.set_cipher_list(profile.cipher_list).unwrap();
    if let Some(suites) = profile.ciphersuites {
        ctx.set_ciphersuites(suites).unwrap();
    }
    let ctx = ctx.build();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        loop {
            let Ok((socket, _)) = listener.accept().await else {
                return;
            };
            let ssl = Ssl::new(&ctx).unwrap();
            tokio::spawn(async move {
                let mut stream = SslStream::new(ssl, socket).unwrap();
                if Pin::new(&mut stream).accept().await.is_err() {
                    return;
                }
                let mut buf = [0u8; 1];
                let _ = stream.read(&mut buf).await;
            });
        }
    });

    port
}

/// A port that refuses connections.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

/// Accepts connections and never answers.
pub async fn spawn_silent_server() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    port
}
