use docserver_controller::crd::DocServer;
use kube::core::CustomResourceExt;

fn main() {
    let crd = DocServer::crd();
    let yaml = serde_yaml::to_string(&crd).expect("serialize CRD to YAML");
    println!("{}", yaml);
}
