//! Log-line builders shared by unit tests.

use crate::config::Config;
use crate::engine::Engine;
use crate::identity::StaticIdentities;
use crate::types::Event;

pub const T0: f64 = 1700000000.0;

pub fn identities() -> StaticIdentities {
  StaticIdentities::new()
    .with(33, "www-data")
    .with(48, "apache")
    .with(101, "nginx")
    .with(1000, "ivan")
}

pub fn parse_log(text: &str) -> Vec<Event> {
  Engine::new(Config::default(), identities())
    .parse_reader(text.as_bytes())
    .unwrap()
    .events
}

pub fn ssh_failure(eid: u64, ts: f64, acct: &str, addr: &str) -> String {
  format!(
    "type=USER_AUTH msg=audit({:.3}:{}): pid=4100 uid=0 auid=4294967295 ses=4294967295 \
     msg='op=PAM:authentication grantors=? acct=\"{}\" exe=\"/usr/sbin/sshd\" \
     hostname={} addr={} terminal=ssh res=failed'\n",
    ts, eid, acct, addr, addr
  )
}

pub fn execve(eid: u64, ts: f64, uid: &str, exe: &str, comm: &str) -> String {
  format!(
    "type=SYSCALL msg=audit({ts:.3}:{eid}): arch=c000003e syscall=59 success=yes exit=0 \
     ppid=812 pid=4411 auid=4294967295 uid={uid} gid={uid} euid={uid} tty=(none) \
     comm=\"{comm}\" exe=\"{exe}\" key=(null)\n\
     type=EXECVE msg=audit({ts:.3}:{eid}): argc=1 a0=\"{comm}\"\n"
  )
}

pub fn file_change(eid: u64, ts: f64, success: &str, paths: &[&str]) -> String {
  let mut out = format!(
    "type=SYSCALL msg=audit({ts:.3}:{eid}): arch=c000003e syscall=257 success={success} exit=3 \
     ppid=2001 pid=2002 auid=1000 uid=0 tty=pts0 comm=\"vi\" exe=\"/usr/bin/vim.basic\" key=\"identity\"\n\
     type=CWD msg=audit({ts:.3}:{eid}): cwd=\"/root\"\n"
  );
  for (item, path) in paths.iter().enumerate() {
    out.push_str(&format!(
      "type=PATH msg=audit({ts:.3}:{eid}): item={item} name=\"{path}\" inode=1234 nametype=NORMAL\n"
    ));
  }
  out
}
