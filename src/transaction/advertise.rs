use crate::callback::CallBack;
use crate::error::GatewayError;
use crate::transaction::Transaction;
use crate::transaction::process::GitProcess;
use crate::transaction::rpc::relay_stdout;
use tracing::debug;

impl Transaction {
    /// Streams a ref advertisement: the `# service=` pkt-line and a flush, then
    /// git's `--advertise-refs` output verbatim.
    pub async fn advertise_refs(self, process: GitProcess, call_back: CallBack) {
        let GitProcess {
            child,
            stdout,
            stderr,
            ..
        } = process;
        let header = format!("# service={}\n", self.service.name());
        let work = async {
            call_back.send_pkt_line(&header).await?;
            call_back.send_flush().await?;
            let sent = relay_stdout(stdout, &call_back).await?;
            debug!(bytes = sent, "ref advertisement relayed");
            Ok::<_, GatewayError>(())
        };
        self.run_to_exit(child, stderr, work).await;
    }
}
