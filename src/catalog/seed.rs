//! Well-known data sources and their field schemas.
//!
//! The seed is merged into every discovery result and is the fallback when
//! the listing or execution collaborators are unavailable.

use super::{DataSourceDescriptor, FieldDescriptor, FieldType, SourceCategory};

pub const AWS_EC2_INSTANCES: &str = "LW_CFG_AWS_EC2_INSTANCES";
pub const AWS_S3_BUCKETS: &str = "LW_CFG_AWS_S3_BUCKETS";
pub const AWS_IAM_USERS: &str = "LW_CFG_AWS_IAM_USERS";
pub const AZURE_VIRTUAL_MACHINES: &str = "LW_CFG_AZURE_COMPUTE_VIRTUAL_MACHINES";
pub const GCP_COMPUTE_INSTANCES: &str = "LW_CFG_GCP_COMPUTE_INSTANCES";
pub const K8S_PODS: &str = "LW_CFG_K8S_PODS";
pub const HOST_MACHINES: &str = "LW_HE_MACHINES";
pub const HOST_CONTAINERS: &str = "LW_HE_CONTAINERS";
pub const HOST_PROCESSES: &str = "LW_HE_PROCESSES";
pub const HOST_USERS: &str = "LW_HE_USERS";
pub const NETWORK_CONNECTIONS: &str = "LW_HA_CONNECTION_SUMMARY";
pub const CONTAINER_VULNERABILITIES: &str = "LW_VULN_CONTAINER_IMAGES";
pub const HOST_VULNERABILITIES: &str = "LW_VULN_HOSTS";
pub const COMPLIANCE_EVALUATIONS: &str = "LW_COMPLIANCE_EVALUATIONS";
pub const CLOUDTRAIL_EVENTS: &str = "CloudTrailRawEvents";

struct SeedField {
    name: &'static str,
    ty: FieldType,
    description: &'static str,
    nullable: bool,
}

struct SeedSource {
    name: &'static str,
    category: SourceCategory,
    description: &'static str,
    fields: &'static [SeedField],
}

const fn f(name: &'static str, ty: FieldType, description: &'static str) -> SeedField {
    SeedField {
        name,
        ty,
        description,
        nullable: false,
    }
}

const fn nullable(name: &'static str, ty: FieldType, description: &'static str) -> SeedField {
    SeedField {
        name,
        ty,
        description,
        nullable: true,
    }
}

use FieldType::{Boolean, Float, IdentifierReference, Integer, IpAddress, Object, Timestamp};
const STR: FieldType = FieldType::String;

static SEED: &[SeedSource] = &[
    SeedSource {
        name: AWS_EC2_INSTANCES,
        category: SourceCategory::Aws,
        description: "AWS EC2 instance configuration inventory",
        fields: &[
            f("ACCOUNT_ID", STR, "AWS account identifier"),
            f("ARN", IdentifierReference, "Instance ARN"),
            f("CLOUD_PROVIDER", STR, "Cloud provider name"),
            f("ENCRYPTED", Boolean, "EBS volume encryption enabled"),
            f("INSTANCE_TYPE", STR, "EC2 instance size"),
            f("IS_PUBLIC", Boolean, "Instance reachable from the internet"),
            f("LAUNCH_TIME", Timestamp, "Instance launch time"),
            nullable("PUBLIC_IP", IpAddress, "Public IPv4 address"),
            f("REGION", STR, "AWS region"),
            f("RESOURCE_ID", STR, "Instance identifier"),
            f("RESOURCE_TYPE", STR, "Resource kind, e.g. instance"),
            f("RISK_SCORE", Integer, "Composite risk score from 0 to 10"),
            f("SEVERITY", STR, "Highest finding severity"),
            f("STATE", STR, "Instance state (running, stopped)"),
            f("TAGS", Object, "Resource tags"),
        ],
    },
    SeedSource {
        name: AWS_S3_BUCKETS,
        category: SourceCategory::Aws,
        description: "AWS S3 bucket configuration and access settings",
        fields: &[
            f("ACCOUNT_ID", STR, "AWS account identifier"),
            f("ARN", IdentifierReference, "Bucket ARN"),
            f("BUCKET_NAME", STR, "Bucket name"),
            f("CLOUD_PROVIDER", STR, "Cloud provider name"),
            f("CREATION_DATE", Timestamp, "Bucket creation time"),
            f("ENCRYPTED", Boolean, "Default server-side encryption enabled"),
            f("IS_PUBLIC", Boolean, "Bucket policy or ACL grants public access"),
            f("REGION", STR, "AWS region"),
            f("RESOURCE_TYPE", STR, "Resource kind, e.g. bucket"),
            f("RISK_SCORE", Integer, "Composite risk score from 0 to 10"),
            f("VERSIONING_ENABLED", Boolean, "Object versioning enabled"),
        ],
    },
    SeedSource {
        name: AWS_IAM_USERS,
        category: SourceCategory::Aws,
        description: "AWS IAM users, credentials and privilege settings",
        fields: &[
            f("ACCESS_KEY_AGE_DAYS", Integer, "Age of the oldest active access key"),
            f("ACCOUNT_ID", STR, "AWS account identifier"),
            f("ARN", IdentifierReference, "User ARN"),
            f("CLOUD_PROVIDER", STR, "Cloud provider name"),
            f("IS_ADMIN", Boolean, "User holds administrator privileges"),
            f("MFA_ENABLED", Boolean, "Multi-factor authentication enabled"),
            nullable("PASSWORD_LAST_USED", Timestamp, "Last console sign-in"),
            f("RISK_SCORE", Integer, "Composite risk score from 0 to 10"),
            f("USER_NAME", STR, "IAM user name"),
        ],
    },
    SeedSource {
        name: AZURE_VIRTUAL_MACHINES,
        category: SourceCategory::Azure,
        description: "Azure compute virtual machine configuration",
        fields: &[
            f("CLOUD_PROVIDER", STR, "Cloud provider name"),
            f("DISK_ENCRYPTED", Boolean, "OS disk encryption enabled"),
            f("IS_PUBLIC", Boolean, "Virtual machine has a public endpoint"),
            f("LOCATION", STR, "Azure region"),
            f("POWER_STATE", STR, "Virtual machine power state"),
            f("RESOURCE_GROUP", STR, "Owning resource group"),
            f("RESOURCE_ID", IdentifierReference, "Azure resource identifier"),
            f("RISK_SCORE", Integer, "Composite risk score from 0 to 10"),
            f("SUBSCRIPTION_ID", STR, "Azure subscription identifier"),
            f("VM_SIZE", STR, "Virtual machine size"),
        ],
    },
    SeedSource {
        name: GCP_COMPUTE_INSTANCES,
        category: SourceCategory::Gcp,
        description: "GCP compute engine instance configuration",
        fields: &[
            f("CLOUD_PROVIDER", STR, "Cloud provider name"),
            nullable("EXTERNAL_IP", IpAddress, "External IPv4 address"),
            f("IS_PUBLIC", Boolean, "Instance reachable from the internet"),
            f("MACHINE_TYPE", STR, "Compute machine type"),
            f("PROJECT_ID", STR, "GCP project identifier"),
            f("RESOURCE_ID", STR, "Instance identifier"),
            f("RISK_SCORE", Integer, "Composite risk score from 0 to 10"),
            f("STATUS", STR, "Instance status (RUNNING, TERMINATED)"),
            f("ZONE", STR, "GCP zone"),
        ],
    },
    SeedSource {
        name: K8S_PODS,
        category: SourceCategory::Kubernetes,
        description: "Kubernetes pod configuration across clusters",
        fields: &[
            f("CLUSTER_NAME", STR, "Kubernetes cluster"),
            f("CREATED_TIME", Timestamp, "Pod creation time"),
            f("HOST_NETWORK", Boolean, "Pod shares the host network namespace"),
            f("IMAGE", STR, "Container image reference"),
            f("NAMESPACE", STR, "Kubernetes namespace"),
            f("POD_NAME", STR, "Pod name"),
            f("PRIVILEGED", Boolean, "Pod runs privileged containers"),
            f("STATUS", STR, "Pod phase"),
        ],
    },
    SeedSource {
        name: HOST_MACHINES,
        category: SourceCategory::Host,
        description: "Agent-monitored machines and their host details",
        fields: &[
            f("CLOUD_PROVIDER", STR, "Cloud provider hosting the machine"),
            f("HOSTNAME", STR, "Machine hostname"),
            f("KERNEL_VERSION", STR, "Running kernel version"),
            f("LAST_SEEN", Timestamp, "Last agent heartbeat"),
            f("MID", Integer, "Machine identifier"),
            f("OS", STR, "Operating system"),
            f("PRIVATE_IP", IpAddress, "Private IPv4 address"),
            nullable("PUBLIC_IP", IpAddress, "Public IPv4 address"),
            f("REGION", STR, "Cloud region"),
            f("STATUS", STR, "Agent status"),
        ],
    },
    SeedSource {
        name: HOST_CONTAINERS,
        category: SourceCategory::Host,
        description: "Running containers observed on monitored hosts",
        fields: &[
            f("CONTAINER_ID", STR, "Container identifier"),
            f("CONTAINER_NAME", STR, "Container name"),
            f("IMAGE_REPO", STR, "Image repository"),
            f("IMAGE_TAG", STR, "Image tag"),
            f("MID", Integer, "Machine identifier"),
            f("PRIVILEGED", Boolean, "Container runs privileged"),
            f("START_TIME", Timestamp, "Container start time"),
            f("STATUS", STR, "Container status"),
        ],
    },
    SeedSource {
        name: HOST_PROCESSES,
        category: SourceCategory::Host,
        description: "Process executions observed on monitored hosts",
        fields: &[
            f("CMDLINE", STR, "Full command line"),
            f("MID", Integer, "Machine identifier"),
            nullable("PARENT_PID", Integer, "Parent process identifier"),
            f("PID", Integer, "Process identifier"),
            f("PROCESS_NAME", STR, "Executable name"),
            f("START_TIME", Timestamp, "Process start time"),
            f("USERNAME", STR, "User running the process"),
        ],
    },
    SeedSource {
        name: HOST_USERS,
        category: SourceCategory::Host,
        description: "Local user accounts and logins on monitored hosts",
        fields: &[
            f("HOME_DIR", STR, "Home directory"),
            nullable("LAST_LOGIN", Timestamp, "Last interactive login"),
            f("MID", Integer, "Machine identifier"),
            f("PRIMARY_GROUP", STR, "Primary group"),
            f("SHELL", STR, "Login shell"),
            f("UID", Integer, "Numeric user id"),
            f("USERNAME", STR, "Account name"),
        ],
    },
    SeedSource {
        name: NETWORK_CONNECTIONS,
        category: SourceCategory::Network,
        description: "Network connection summaries between entities",
        fields: &[
            f("BYTES_IN", Integer, "Inbound bytes"),
            f("BYTES_OUT", Integer, "Outbound bytes"),
            f("DIRECTION", STR, "Connection direction (inbound, outbound)"),
            f("DST_ENTITY", STR, "Destination entity"),
            f("DST_IP", IpAddress, "Destination IP address"),
            f("DST_PORT", Integer, "Destination port"),
            f("PROTOCOL", STR, "Transport protocol"),
            f("SRC_ENTITY", STR, "Source entity"),
            f("SRC_IP", IpAddress, "Source IP address"),
            f("START_TIME", Timestamp, "Connection start time"),
        ],
    },
    SeedSource {
        name: CONTAINER_VULNERABILITIES,
        category: SourceCategory::Vulnerability,
        description: "Vulnerabilities found in container images",
        fields: &[
            f("CVSS_SCORE", Float, "CVSS base score"),
            f("FIRST_SEEN", Timestamp, "First detection time"),
            f("FIX_AVAILABLE", Boolean, "A fixed package version exists"),
            f("IMAGE_ID", STR, "Image digest"),
            f("IMAGE_REPO", STR, "Image repository"),
            f("IMAGE_TAG", STR, "Image tag"),
            f("PACKAGE_NAME", STR, "Vulnerable package"),
            f("SEVERITY", STR, "Vulnerability severity"),
            f("STATUS", STR, "Finding status (active, fixed)"),
            f("VULN_ID", STR, "CVE identifier"),
        ],
    },
    SeedSource {
        name: HOST_VULNERABILITIES,
        category: SourceCategory::Vulnerability,
        description: "Vulnerabilities found on monitored hosts",
        fields: &[
            f("CVSS_SCORE", Float, "CVSS base score"),
            f("FIRST_SEEN", Timestamp, "First detection time"),
            f("FIX_AVAILABLE", Boolean, "A fixed package version exists"),
            f("HOSTNAME", STR, "Machine hostname"),
            f("MID", Integer, "Machine identifier"),
            f("PACKAGE_NAME", STR, "Vulnerable package"),
            f("SEVERITY", STR, "Vulnerability severity"),
            f("STATUS", STR, "Finding status (active, fixed)"),
            f("VULN_ID", STR, "CVE identifier"),
        ],
    },
    SeedSource {
        name: COMPLIANCE_EVALUATIONS,
        category: SourceCategory::Compliance,
        description: "Compliance policy evaluations for cloud resources",
        fields: &[
            f("ACCOUNT_ID", STR, "Cloud account identifier"),
            f("CLOUD_PROVIDER", STR, "Cloud provider name"),
            f("EVALUATION_TIME", Timestamp, "Evaluation time"),
            f("POLICY_ID", STR, "Evaluated policy"),
            f("REGION", STR, "Cloud region"),
            f("REPORT_TYPE", STR, "Compliance framework, e.g. CIS or PCI"),
            f("RESOURCE_ID", STR, "Evaluated resource"),
            f("SEVERITY", STR, "Policy severity"),
            f("STATUS", STR, "Evaluation status (Compliant, NonCompliant)"),
        ],
    },
    SeedSource {
        name: CLOUDTRAIL_EVENTS,
        category: SourceCategory::Activity,
        description: "Raw AWS CloudTrail API activity events",
        fields: &[
            f("ACCOUNT_ID", STR, "AWS account identifier"),
            f("AWS_REGION", STR, "Region the call was made in"),
            nullable("ERROR_CODE", STR, "Error code for failed calls"),
            nullable("ERROR_MESSAGE", STR, "Error message for failed calls"),
            f("EVENT_NAME", STR, "API action name"),
            f("EVENT_SOURCE", STR, "AWS service endpoint"),
            f("EVENT_TIME", Timestamp, "Event time"),
            f("SOURCE_IP", IpAddress, "Caller IP address"),
            f("USER_ARN", IdentifierReference, "Caller identity ARN"),
            f("USER_TYPE", STR, "Caller identity type (Root, IAMUser)"),
        ],
    },
];

fn descriptor(seed: &SeedSource) -> DataSourceDescriptor {
    DataSourceDescriptor {
        name: seed.name.to_string(),
        category: seed.category,
        description: seed.description.to_string(),
        fields: None,
        sample_rows: None,
    }
}

/// Every seeded descriptor, sorted by name, without fields.
pub fn seed_descriptors() -> Vec<DataSourceDescriptor> {
    let mut out: Vec<DataSourceDescriptor> = SEED.iter().map(descriptor).collect();
    out.sort_by(|a, b| a.name.cmp(&b.name));
    out
}

/// Seeded descriptor for `name` (case-insensitive).
pub fn seed_descriptor(name: &str) -> Option<DataSourceDescriptor> {
    SEED.iter()
        .find(|s| s.name.eq_ignore_ascii_case(name))
        .map(descriptor)
}

/// Static field schema for `name`, sorted by field name.  Empty when the
/// source is not seeded.
pub fn known_fields(name: &str) -> Vec<FieldDescriptor> {
    let Some(seed) = SEED.iter().find(|s| s.name.eq_ignore_ascii_case(name)) else {
        return Vec::new();
    };
    let mut fields: Vec<FieldDescriptor> = seed
        .fields
        .iter()
        .map(|sf| FieldDescriptor {
            name: sf.name.to_string(),
            field_type: sf.ty,
            description: Some(sf.description.to_string()),
            sample_values: Vec::new(),
            nullable: sf.nullable,
        })
        .collect();
    fields.sort_by(|a, b| a.name.cmp(&b.name));
    fields
}
