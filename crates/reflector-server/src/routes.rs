//! Request routing
//!
//! - `GET /` - usage page
//! - `GET /reflect` - fetch a manifest and return it with a resolvable `Source-Url`

use crate::http::{HttpRequest, HttpResponse};
use reflector_core::{reflect, ManifestError, ManifestSource};
use std::collections::HashMap;
use url::Url;

/// Response header naming the rewrite rule that fired
pub const REFLECT_HEADER: &str = "X-OpenShift-Cartridge-Reflect";

/// Commit used for `github=` requests without `commit=`
pub const DEFAULT_COMMIT: &str = "master";

const MISSING_URL: &str = "Pass URL to reflect as parameter 'u'";
const INVALID_URL: &str = "Pass a valid URL";
const MISSING_HOST: &str = "Pass a URL with a scheme and a host";

/// Dispatches requests to the help page or the reflector
pub struct Router<S> {
    source: S,
}

impl<S: ManifestSource> Router<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn handle(&self, request: &HttpRequest) -> HttpResponse {
        if request.method != "GET" {
            return HttpResponse::text(405, "Method not allowed").with_header("Allow", "GET");
        }

        match request.path.as_str() {
            "/" => help(request),
            "/reflect" => self.reflect(request),
            _ => HttpResponse::text(404, "Not found"),
        }
    }

    fn reflect(&self, request: &HttpRequest) -> HttpResponse {
        let params = request.params();

        let url = match manifest_url(&params) {
            Ok(url) => url,
            Err(message) => return HttpResponse::text(400, message),
        };
        let force_rewrite = params.contains_key("r");
        let version = non_empty(&params, "v");

        let result = self
            .source
            .fetch(&url)
            .map_err(ManifestError::from)
            .and_then(|bytes| reflect(&bytes, &url, version, force_rewrite));

        match result {
            Ok(reflection) => {
                tracing::info!(%url, outcome = %reflection.outcome, "reflected manifest");
                HttpResponse::text(200, reflection.body)
                    .with_header(REFLECT_HEADER, reflection.outcome.as_str())
            }
            Err(err) => {
                tracing::warn!(%url, kind = err.kind(), error = %err, "reflection failed");
                HttpResponse::text(err.status_code(), err.to_string())
            }
        }
    }
}

fn non_empty<'a>(params: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    params.get(name).map(String::as_str).filter(|v| !v.is_empty())
}

/// Resolve the manifest URL from `github`/`commit` or `u`
fn manifest_url(params: &HashMap<String, String>) -> Result<Url, &'static str> {
    let url = match non_empty(params, "github") {
        Some(project) => {
            let commit = non_empty(params, "commit").unwrap_or(DEFAULT_COMMIT);
            let raw = format!("https://raw.github.com/{}/{}/metadata/manifest.yml", project, commit);
            Url::parse(&raw).map_err(|_| INVALID_URL)?
        }
        None => {
            let raw = non_empty(params, "u").ok_or(MISSING_URL)?;
            Url::parse(raw).map_err(|err| match err {
                // Parses as a reference, just not an absolute one
                url::ParseError::RelativeUrlWithoutBase => MISSING_HOST,
                _ => INVALID_URL,
            })?
        }
    };

    if url.host_str().map_or(true, str::is_empty) || url.path() == "/reflect" {
        return Err(MISSING_HOST);
    }
    Ok(url)
}

fn help(request: &HttpRequest) -> HttpResponse {
    let base = format!("http://{}", request.header("host").unwrap_or("localhost"));
    HttpResponse::text(200, help_text(&base))
}

fn help_text(base: &str) -> String {
    format!(
        r#"Cartridge reflector

Rewrites cartridge manifests so they always carry a usable Source-Url.
Pass the manifest location as the 'u' parameter of /reflect:

   {base}/reflect?u=https://url.to.my.server/path/of/my/manifest.yml

For a manifest hosted on GitHub, pass 'github' as '<user>/<project>' instead;
'metadata/manifest.yml' is assumed. 'commit' picks a commit, branch or tag
(default: {commit}):

   {base}/reflect?github=smarterclayton/openshift-go-cart&commit=master

Other parameters:

   r=1       rewrite Source-Url even when it is already fully qualified
   v=<ver>   select a version listed in Version/Versions, applying its
             Version-Overrides entry first

Source-Url rewrites, first match wins:

 * Fully qualified URL: returned as-is (unless 'r' is passed)
 * Relative path: resolved against the manifest URL
 * Manifest URL is a raw GitHub file: GitHub's archive zip for that commit
 * Manifest URL does not end in '/metadata/manifest.yml' or
   '/metadata/manifest.yaml': the same name with .tar.gz at the end

The rule that fired is reported in the {header} response header.

Examples:

  Manifest URL           Source-Url                Result
  ------------           ----------                ------
  http://a.com/cart/foo  http://a.com/cart/bar.zip http://a.com/cart/bar.zip
   "                     bar.zip                   http://a.com/cart/bar.zip
   "                     --                        http://a.com/cart/foo.tar.gz

  http://github.com/me/project/raw/master/metadata/manifest.yml ->
    https://github.com/me/project/archive/master.zip

  https://raw.github.com/me/project/3107eb65cccdeefbd7ea0622c7eab9a2249bf3f2/metadata/manifest.yml ->
    https://github.com/me/project/archive/3107eb65cccdeefbd7ea0622c7eab9a2249bf3f2.zip
"#,
        base = base,
        commit = DEFAULT_COMMIT,
        header = REFLECT_HEADER,
    )
}
