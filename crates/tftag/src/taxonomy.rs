//! which resource types take tags, and under which attribute
//!
//! Providers are recognised by the prefix of the resource type (`aws_instance` belongs to
//! `aws`). Each provider names its tag attribute differently and only a subset of its resource
//! types supports tagging at all.

/// Lookup from resource type to tagging support
pub trait Taxonomy {
    /// Name of the attribute that holds tags, by provider
    fn attribute_name(&self, resource_type: &str) -> Result<&'static str, UnknownProvider>;

    fn is_taggable(&self, resource_type: &str) -> bool;
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("`{0}` does not belong to a supported provider")]
pub struct UnknownProvider(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Aws,
    Google,
    Azure,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Aws, Provider::Google, Provider::Azure];

    pub fn of(resource_type: &str) -> Option<Provider> {
        Self::ALL
            .into_iter()
            .find(|provider| resource_type.starts_with(provider.prefix()))
    }

    pub fn prefix(self) -> &'static str {
        match self {
            Provider::Aws => "aws_",
            Provider::Google => "google_",
            Provider::Azure => "azurerm_",
        }
    }

    pub fn attribute_name(self) -> &'static str {
        match self {
            Provider::Aws | Provider::Azure => "tags",
            Provider::Google => "labels",
        }
    }

    /// Taggable resource types, sorted
    pub fn taggable(self) -> &'static [&'static str] {
        match self {
            Provider::Aws => AWS,
            Provider::Google => GOOGLE,
            Provider::Azure => AZURE,
        }
    }
}

/// Built-in tables for the AWS, Google Cloud and Azure providers
#[derive(Debug, Clone, Copy, Default)]
pub struct Providers;

impl Taxonomy for Providers {
    fn attribute_name(&self, resource_type: &str) -> Result<&'static str, UnknownProvider> {
        Provider::of(resource_type)
            .map(Provider::attribute_name)
            .ok_or_else(|| UnknownProvider(resource_type.to_string()))
    }

    fn is_taggable(&self, resource_type: &str) -> bool {
        Provider::of(resource_type)
            .is_some_and(|provider| provider.taggable().binary_search(&resource_type).is_ok())
    }
}

const AWS: &[&str] = &[
    "aws_acm_certificate",
    "aws_alb",
    "aws_alb_target_group",
    "aws_ami",
    "aws_api_gateway_rest_api",
    "aws_apigatewayv2_api",
    "aws_autoscaling_group",
    "aws_cloudfront_distribution",
    "aws_cloudtrail",
    "aws_cloudwatch_log_group",
    "aws_cloudwatch_metric_alarm",
    "aws_codebuild_project",
    "aws_db_instance",
    "aws_db_subnet_group",
    "aws_dynamodb_table",
    "aws_ebs_volume",
    "aws_ecr_repository",
    "aws_ecs_cluster",
    "aws_ecs_service",
    "aws_ecs_task_definition",
    "aws_efs_file_system",
    "aws_eip",
    "aws_eks_cluster",
    "aws_eks_node_group",
    "aws_elasticache_cluster",
    "aws_elb",
    "aws_iam_policy",
    "aws_iam_role",
    "aws_iam_user",
    "aws_instance",
    "aws_internet_gateway",
    "aws_kinesis_stream",
    "aws_kms_key",
    "aws_lambda_function",
    "aws_launch_template",
    "aws_lb",
    "aws_lb_target_group",
    "aws_nat_gateway",
    "aws_rds_cluster",
    "aws_route53_zone",
    "aws_route_table",
    "aws_s3_bucket",
    "aws_secretsmanager_secret",
    "aws_security_group",
    "aws_sfn_state_machine",
    "aws_sns_topic",
    "aws_sqs_queue",
    "aws_ssm_parameter",
    "aws_subnet",
    "aws_vpc",
    "aws_vpc_endpoint",
];

const GOOGLE: &[&str] = &[
    "google_bigquery_dataset",
    "google_bigquery_table",
    "google_bigtable_instance",
    "google_cloud_run_v2_service",
    "google_cloudfunctions_function",
    "google_compute_address",
    "google_compute_disk",
    "google_compute_forwarding_rule",
    "google_compute_image",
    "google_compute_instance",
    "google_compute_instance_template",
    "google_compute_snapshot",
    "google_container_cluster",
    "google_dataproc_cluster",
    "google_dns_managed_zone",
    "google_filestore_instance",
    "google_kms_crypto_key",
    "google_pubsub_subscription",
    "google_pubsub_topic",
    "google_redis_instance",
    "google_secret_manager_secret",
    "google_spanner_instance",
    "google_sql_database_instance",
    "google_storage_bucket",
];

const AZURE: &[&str] = &[
    "azurerm_app_service",
    "azurerm_app_service_plan",
    "azurerm_application_gateway",
    "azurerm_container_registry",
    "azurerm_cosmosdb_account",
    "azurerm_dns_zone",
    "azurerm_eventhub_namespace",
    "azurerm_function_app",
    "azurerm_key_vault",
    "azurerm_kubernetes_cluster",
    "azurerm_lb",
    "azurerm_linux_virtual_machine",
    "azurerm_linux_web_app",
    "azurerm_log_analytics_workspace",
    "azurerm_managed_disk",
    "azurerm_mssql_database",
    "azurerm_mssql_server",
    "azurerm_network_interface",
    "azurerm_network_security_group",
    "azurerm_postgresql_flexible_server",
    "azurerm_public_ip",
    "azurerm_redis_cache",
    "azurerm_resource_group",
    "azurerm_servicebus_namespace",
    "azurerm_storage_account",
    "azurerm_virtual_machine",
    "azurerm_virtual_network",
    "azurerm_windows_virtual_machine",
];
