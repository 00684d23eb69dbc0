use std::io::stdout;

use expdep::ExperimentDeployment;
use k8s_openapi::List;
use kube::CustomResourceExt;

fn main() -> serde_json::Result<()> {
    let items = vec![ExperimentDeployment::crd()];
    serde_json::to_writer_pretty(
        stdout(),
        &List {
            items,
            ..Default::default()
        },
    )
}
