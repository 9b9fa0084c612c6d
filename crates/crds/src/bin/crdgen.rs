//! Prints the NicDevice CustomResourceDefinition as YAML.
//!
//! ```sh
//! cargo run -p crds --bin crdgen > config/crd/nicdevice.yaml
//! ```

use crds::NicDevice;
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    print!("{}", serde_yaml::to_string(&NicDevice::crd())?);
    Ok(())
}
