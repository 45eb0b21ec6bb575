use super::service_map;
use crate::output::{ComposeService, OutputContainer};
use crate::stack::{
    Capability, Category, ContextError, GenerationContext, ProjectContext, Provider, ServiceScope,
};
use anyhow::Result;
use indexmap::IndexMap;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cloud {
    Aws,
    Gcp,
}

impl Cloud {
    /// Cloud implied by the selected storage; AWS unless the storage lives on GCP.
    pub fn for_storage(storage: Option<&str>) -> Self {
        match storage {
            Some("BigQuery") => Cloud::Gcp,
            _ => Cloud::Aws,
        }
    }
}

pub struct TerraformProvider;

impl TerraformProvider {
    fn main_tf(project: &str, cloud: Cloud) -> String {
        match cloud {
            Cloud::Aws => format!(
                r#"terraform {{
  required_providers {{
    aws = {{
      source  = "hashicorp/aws"
      version = "~> 5.0"
    }}
  }}
}}

provider "aws" {{
  region = var.region
}}

resource "aws_s3_bucket" "data_lake" {{
  bucket = "{project}-${{var.environment}}-data-lake"
}}

resource "aws_db_instance" "metadata_db" {{
  identifier          = "{project}-${{var.environment}}-metadata"
  engine              = "postgres"
  instance_class      = "db.t3.micro"
  allocated_storage   = 20
  username            = "admin"
  password            = var.db_password
  skip_final_snapshot = true
}}
"#,
                project = project.replace('_', "-")
            ),
            Cloud::Gcp => format!(
                r#"terraform {{
  required_providers {{
    google = {{
      source  = "hashicorp/google"
      version = "~> 5.0"
    }}
  }}
}}

provider "google" {{
  project = var.gcp_project_id
  region  = var.region
}}

resource "google_storage_bucket" "data_lake" {{
  name     = "{project}-${{var.environment}}-data-lake"
  location = var.region
}}

resource "google_bigquery_dataset" "analytics" {{
  dataset_id = "{dataset}_analytics"
  location   = "US"
}}
"#,
                project = project.replace('_', "-"),
                dataset = project.replace('-', "_")
            ),
        }
    }

    fn variables_tf(project: &str, cloud: Cloud) -> String {
        let region = match cloud {
            Cloud::Aws => "us-east-1",
            Cloud::Gcp => "us-central1",
        };
        let mut vars = format!(
            r#"variable "environment" {{
  description = "Deployment environment (dev/staging/prod)"
  type        = string
  default     = "dev"
}}

variable "project_name" {{
  description = "Name of the project"
  type        = string
  default     = "{project}"
}}

variable "region" {{
  type    = string
  default = "{region}"
}}

variable "db_password" {{
  type      = string
  sensitive = true
}}
"#,
            project = project,
            region = region
        );
        if cloud == Cloud::Gcp {
            vars.push_str(&format!(
                "\nvariable \"gcp_project_id\" {{\n  type    = string\n  default = \"{}-project\"\n}}\n",
                project.replace('_', "-")
            ));
        }
        vars
    }
}

impl Provider for TerraformProvider {
    fn name(&self) -> &str {
        "Terraform"
    }

    fn category(&self) -> Category {
        Category::Infrastructure
    }

    fn register_services(&self, scope: &mut ServiceScope<'_>) -> Result<(), ContextError> {
        let password = scope.secret_with_length("terraform_db_password", 32);
        let conn = scope
            .connection("terraform", "terraform")
            .host("localhost")
            .env_prefix("TF_")
            .capabilities([Capability::Infrastructure])
            .credential("password", password);
        scope.register(conn)
    }

    fn generate(&self, ctx: &GenerationContext<'_>, output: &mut OutputContainer) -> Result<()> {
        let project = ctx.project_name();
        let cloud = Cloud::for_storage(ctx.storage());
        output.add("terraform/main.tf", Self::main_tf(project, cloud));
        output.add("terraform/variables.tf", Self::variables_tf(project, cloud));
        let outputs = match cloud {
            Cloud::Aws => "output \"storage_bucket_name\" {\n  value = aws_s3_bucket.data_lake.id\n}\n\n\
                           output \"database_endpoint\" {\n  value     = aws_db_instance.metadata_db.endpoint\n  sensitive = true\n}\n",
            Cloud::Gcp => "output \"storage_bucket_name\" {\n  value = google_storage_bucket.data_lake.name\n}\n",
        };
        output.add("terraform/outputs.tf", outputs);
        Ok(())
    }

    fn compose_services(&self, context: &ProjectContext) -> IndexMap<String, ComposeService> {
        let cloud = Cloud::for_storage(context.stack().get(Category::Storage));
        let mut services = service_map([(
            "terraform",
            ComposeService::image("hashicorp/terraform:1.7")
                .oneshot()
                .env("TF_VAR_db_password", "${TF_VAR_db_password}")
                .env("TF_VAR_project_name", context.project_name())
                .volume("./terraform:/workspace")
                .command("-chdir=/workspace plan"),
        )]);
        if cloud == Cloud::Aws {
            services.insert(
                "localstack".to_string(),
                ComposeService::image("localstack/localstack:latest")
                    .env("SERVICES", "s3,rds")
                    .env("DEFAULT_REGION", "us-east-1")
                    .port(4566, 4566)
                    .volume("localstack_data:/var/lib/localstack"),
            );
        }
        services
    }

    fn compose_volumes(&self) -> Vec<String> {
        vec!["localstack_data".to_string()]
    }

    fn env_vars(&self, context: &ProjectContext) -> BTreeMap<String, String> {
        let mut vars = BTreeMap::from([
            ("TF_VAR_project_name".to_string(), context.project_name().to_string()),
            ("TF_VAR_environment".to_string(), "dev".to_string()),
            (
                "TF_VAR_db_password".to_string(),
                super::secret_or(context, "terraform_db_password", ""),
            ),
        ]);
        match Cloud::for_storage(context.stack().get(Category::Storage)) {
            Cloud::Aws => {
                vars.insert("AWS_ACCESS_KEY_ID".to_string(), "CHANGE_ME_AWS_ACCESS_KEY_ID".to_string());
                vars.insert(
                    "AWS_SECRET_ACCESS_KEY".to_string(),
                    "CHANGE_ME_AWS_SECRET_ACCESS_KEY".to_string(),
                );
                vars.insert("AWS_DEFAULT_REGION".to_string(), "us-east-1".to_string());
            }
            Cloud::Gcp => {
                vars.insert(
                    "GOOGLE_APPLICATION_CREDENTIALS".to_string(),
                    "./secrets/service-account.json".to_string(),
                );
            }
        }
        vars
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Wiring;
    use crate::secrets::RngSecretSource;
    use crate::stack::Stack;

    #[test]
    fn test_cloud_for_storage() {
        assert_eq!(Cloud::for_storage(Some("BigQuery")), Cloud::Gcp);
        assert_eq!(Cloud::for_storage(Some("Snowflake")), Cloud::Aws);
        assert_eq!(Cloud::for_storage(None), Cloud::Aws);
    }

    #[test]
    fn test_terraform_password_is_shared() {
        let stack = Stack::new()
            .with(Category::Storage, "BigQuery")
            .with(Category::Infrastructure, "Terraform");
        let mut ctx =
            ProjectContext::with_secret_source("acme_data", stack, Box::new(RngSecretSource::seeded(8)));
        TerraformProvider
            .register_services(&mut ServiceScope::new(TerraformProvider.id(), &mut ctx))
            .unwrap();
        let password = ctx.secret("terraform_db_password").unwrap().to_string();
        assert_eq!(password.len(), 32);
        assert_eq!(TerraformProvider.env_vars(&ctx)["TF_VAR_db_password"], password);

        let wiring = Wiring::None;
        let id = TerraformProvider.id();
        let gen = GenerationContext {
            project: &ctx,
            wiring: &wiring,
            component: &id,
        };
        let mut out = OutputContainer::new();
        TerraformProvider.generate(&gen, &mut out).unwrap();
        assert!(out.get("terraform/main.tf").unwrap().contains("google_bigquery_dataset"));
        assert!(out.get("terraform/variables.tf").unwrap().contains("acme-data-project"));
        assert!(!TerraformProvider.compose_services(&ctx).contains_key("localstack"));
    }
}
