use std::{
    net::Ipv4Addr,
    sync::atomic::{AtomicUsize, Ordering},
};

use anyhow::Result as AnyResult;
use base64::{engine::general_purpose::STANDARD, Engine};
use common::{
    credential::{CredentialService, TokenRequest},
    provider::{Datacenter, Declaration, Image, ImageDisk},
};
use topology::{
    cloud_init::FileTemplates,
    environment::{EnvironmentProps, Network, NodeSettings},
    inventory::Inventory,
    node,
    ByNodeType, Cluster, ClusterProps, Environment, Error, NodeType, ResourcePool,
};

struct StaticVault {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl CredentialService for StaticVault {
    async fn issue_token(&self, _: &TokenRequest) -> AnyResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("hvs.integration".to_owned())
    }

    fn name(&self) -> String {
        "static".to_owned()
    }
}

fn vault() -> StaticVault {
    StaticVault {
        calls: AtomicUsize::new(0),
    }
}

fn request() -> TokenRequest {
    TokenRequest {
        policies: vec!["ssh-signer".to_owned()],
        lease: "60m".to_owned(),
    }
}

fn environment(pools: Vec<ResourcePool>) -> Environment {
    environment_on("172.16.0.0/24", pools)
}

fn environment_on(subnet: &str, pools: Vec<ResourcePool>) -> Environment {
    Environment::new(EnvironmentProps {
        name: "prod".to_owned(),
        datacenter: Datacenter {
            id: "datacenter-3".to_owned(),
            name: "Home".to_owned(),
        },
        domain: "cluster.example".to_owned(),
        pools,
        network: Network {
            id: "dvportgroup-44".to_owned(),
            subnet: subnet.parse().expect("subnet should parse"),
            dns_servers: vec!["172.16.0.53".to_owned()],
            domains: vec!["cluster.example".to_owned(), "example".to_owned()],
        },
        image: Image {
            id: "420f-ubuntu".to_owned(),
            guest_id: "ubuntu64Guest".to_owned(),
            disks: vec![ImageDisk {
                size: 31.999,
                thin_provisioned: true,
                eagerly_scrub: false,
            }],
        },
        settings: ByNodeType::new(
            NodeSettings {
                name: "{env}-cp{index}".to_owned(),
                network_offset: 100,
                cpus: 2,
                memory: 4096,
            },
            NodeSettings {
                name: "{env}-node{index}".to_owned(),
                network_offset: 150,
                cpus: 8,
                memory: 16384,
            },
        ),
        vault_address: "https://vault.example:8200".to_owned(),
    })
    .expect("environment should be valid")
}

fn templates() -> FileTemplates {
    FileTemplates::new(concat!(env!("CARGO_MANIFEST_DIR"), "/../files"))
}

fn decode(payload: &str) -> String {
    String::from_utf8(STANDARD.decode(payload).expect("payload should be base64"))
        .expect("payload should be utf-8")
}

#[tokio::test]
async fn builds_cluster_with_shipped_templates() {
    let env = environment(vec![
        ResourcePool::new("resgroup-a", "datastore-a", 1),
        ResourcePool::new("resgroup-b", "datastore-b", 1),
    ]);
    let vault = vault();
    let cluster = Cluster::create(
        "prod",
        ClusterProps {
            nodes: 5,
            masters: 3,
        },
        &env,
        &vault,
        &request(),
        &templates(),
    )
    .await
    .expect("cluster should build");

    assert_eq!(vault.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        cluster.masters(),
        &[
            "prod-cp01.cluster.example",
            "prod-cp02.cluster.example",
            "prod-cp03.cluster.example"
        ]
    );
    assert_eq!(cluster.workers().len(), 2);

    let master = &cluster.nodes(NodeType::Master)[1];
    assert_eq!(master.pool.id, "resgroup-b");
    assert_eq!(master.ip.ip_address, Ipv4Addr::new(172, 16, 0, 102));
    assert_eq!(master.disks[0].size, 32);

    let metadata = decode(&master.payloads.metadata);
    assert!(metadata.contains("local-hostname: prod-cp02"));
    assert!(metadata.contains("- 172.16.0.102/24"));
    assert!(metadata.contains("gateway4: 172.16.0.1"));
    assert!(metadata.contains("- example"));

    let userdata = decode(&master.payloads.userdata);
    assert!(userdata.contains("VAULT_TOKEN=\"hvs.integration\""));
    assert!(userdata.contains("VAULT_ADDR=\"https://vault.example:8200\""));
}

#[tokio::test]
async fn declaration_is_reproducible() {
    let env = environment(vec![ResourcePool::new("resgroup-a", "datastore-a", 1)]);
    let props = ClusterProps {
        nodes: 4,
        masters: 1,
    };

    let mut first = Declaration::new();
    Cluster::create("prod", props.clone(), &env, &vault(), &request(), &templates())
        .await
        .expect("cluster should build")
        .declare(&env, &mut first);

    let mut second = Declaration::new();
    Cluster::create("prod", props, &env, &vault(), &request(), &templates())
        .await
        .expect("cluster should build")
        .declare(&env, &mut second);

    assert_eq!(first, second);
    assert_eq!(first.len(), 4);
    let vm = first.get("vm-prod-node03").expect("worker 3 should be declared");
    assert_eq!(vm.memory, 16384);
    assert_eq!(vm.datastore_id, "datastore-a");
}

#[tokio::test]
async fn workers_can_overflow_the_subnet() {
    // 150 + 110 runs past the end of the /24; this is logged, not rejected
    let env = environment(vec![ResourcePool::new("resgroup-a", "datastore-a", 1)]);
    let cluster = Cluster::create(
        "prod",
        ClusterProps {
            nodes: 111,
            masters: 1,
        },
        &env,
        &vault(),
        &request(),
        &templates(),
    )
    .await
    .expect("cluster should build");

    let last = cluster
        .nodes(NodeType::Worker)
        .last()
        .expect("workers should exist");
    assert_eq!(last.index, 110);
    assert_eq!(last.ip.ip_address, Ipv4Addr::new(172, 16, 1, 4));
}

#[test]
fn metadata_carries_the_subnet_prefix() {
    let env = environment_on(
        "10.10.0.0/16",
        vec![ResourcePool::new("resgroup-a", "datastore-a", 1)],
    );
    let worker = node::build(
        NodeType::Worker,
        300,
        &env.pools()[0],
        &env,
        "hvs.integration",
        &templates(),
    )
    .expect("node should build");

    let metadata = decode(&worker.payloads.metadata);
    assert!(metadata.contains("- 10.10.1.194/16"));
    assert!(!metadata.contains("/24"));
    assert!(metadata.contains("gateway4: 10.10.0.1"));
}

#[tokio::test]
async fn missing_template_directory_fails_the_build() {
    let env = environment(vec![ResourcePool::new("resgroup-a", "datastore-a", 1)]);
    let err = Cluster::create(
        "prod",
        ClusterProps {
            nodes: 3,
            masters: 1,
        },
        &env,
        &vault(),
        &request(),
        &FileTemplates::new("/nonexistent"),
    )
    .await
    .expect_err("missing templates should fail");

    assert!(matches!(err, Error::Template { .. }));
    assert!(!err.is_invariant_violation());
}

#[tokio::test]
async fn inventory_from_outputs() {
    let env = environment(vec![ResourcePool::new("resgroup-a", "datastore-a", 1)]);
    let cluster = Cluster::create(
        "prod",
        ClusterProps {
            nodes: 5,
            masters: 1,
        },
        &env,
        &vault(),
        &request(),
        &templates(),
    )
    .await
    .expect("cluster should build");

    let outputs = cluster.outputs(&env);
    let json = serde_json::to_value(&outputs).expect("outputs should serialize");
    assert_eq!(json["cluster"]["node_count"], 5);
    assert_eq!(json["environment"]["name"], "prod");

    let rendered = Inventory::from_output(&outputs.cluster)
        .render(&templates())
        .expect("inventory should render");
    let etcd = rendered
        .split("[etcd]\n")
        .nth(1)
        .and_then(|s| s.split("\n\n").next())
        .expect("etcd group should exist");
    assert_eq!(
        etcd.lines().collect::<Vec<_>>(),
        vec![
            "prod-cp01.cluster.example",
            "prod-node01.cluster.example",
            "prod-node02.cluster.example"
        ]
    );
}
